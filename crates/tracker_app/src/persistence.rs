use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracker_core::{ItemStatus, TrackedItem};
use tracker_logging::{tracker_info, tracker_warn};

const STATE_FILENAME: &str = ".scrape_tracker.ron";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("could not serialize tracked items: {0}")]
    Serialize(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedItem {
    id: String,
    url: String,
    batch_id: Option<String>,
    status: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    items: Vec<PersistedItem>,
}

pub fn state_file(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILENAME)
}

/// Load tracked items; a missing or unreadable file yields an empty list.
pub fn load_items(state_dir: &Path) -> Vec<TrackedItem> {
    let path = state_file(state_dir);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Vec::new();
        }
        Err(err) => {
            tracker_warn!("Failed to read tracked items from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            tracker_warn!("Failed to parse tracked items from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let items: Vec<TrackedItem> = state
        .items
        .into_iter()
        .filter_map(|persisted| {
            let Some(status) = ItemStatus::parse(&persisted.status) else {
                tracker_warn!(
                    "Skipping item {} with unknown status {:?}",
                    persisted.id,
                    persisted.status
                );
                return None;
            };
            let mut item = TrackedItem::new(
                persisted.id,
                persisted.url,
                persisted.batch_id,
                persisted.start_time,
            )
            .with_status(status);
            item.end_time = persisted.end_time;
            Some(item)
        })
        .collect();

    tracker_info!("Loaded {} tracked item(s) from {:?}", items.len(), path);
    items
}

pub fn save_items(state_dir: &Path, items: &[TrackedItem]) -> Result<PathBuf, PersistError> {
    let state = PersistedState {
        items: items
            .iter()
            .map(|item| PersistedItem {
                id: item.id.clone(),
                url: item.url.clone(),
                batch_id: item.batch_id.clone(),
                status: item.status.as_str().to_string(),
                start_time: item.start_time,
                end_time: item.end_time,
            })
            .collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(&state, pretty)
        .map_err(|err| PersistError::Serialize(err.to_string()))?;

    AtomicFileWriter::new(state_dir.to_path_buf()).write(STATE_FILENAME, &content)
}

/// Ensure the state directory exists; create if missing.
pub fn ensure_state_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StateDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` through a temp file and rename.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_state_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
