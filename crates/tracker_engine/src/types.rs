use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Ticket = u64;

/// Lifecycle call understood by the scraping service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Pause,
    Resume,
    Stop,
    Retry,
    Delete,
}

impl LifecycleAction {
    /// Trailing path segment for the POST-based actions.
    pub(crate) fn path_segment(self) -> Option<&'static str> {
        match self {
            LifecycleAction::Pause => Some("pause"),
            LifecycleAction::Resume => Some("resume"),
            LifecycleAction::Stop => Some("stop"),
            LifecycleAction::Retry => Some("retry"),
            LifecycleAction::Delete => None,
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment().unwrap_or("delete"))
    }
}

/// Aggregate job progress as reported by `GET /scraping/current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub batch_id: String,
    #[serde(default)]
    pub total_sites: u32,
    #[serde(default)]
    pub completed_sites: u32,
    #[serde(default)]
    pub failed_sites: u32,
    #[serde(default)]
    pub pending_sites: u32,
    #[serde(default)]
    pub active_sites: Vec<String>,
    #[serde(default)]
    pub failed_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPayload {
    pub batch_id: String,
    #[serde(default)]
    pub results: BTreeMap<String, PageResultPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResultPayload {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl PageResultPayload {
    /// Number of records scraped from the page: array length, one for a single
    /// object, zero when the page produced no data.
    pub fn record_count(&self) -> usize {
        match &self.data {
            serde_json::Value::Null => 0,
            serde_json::Value::Array(records) => records.len(),
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SubmitRequest<'a> {
    pub urls: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub batch_id: String,
    #[serde(default)]
    pub items: Vec<SubmittedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedItem {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Submitted(Result<SubmitResponse, ClientError>),
    ActionCompleted {
        item_id: String,
        action: LifecycleAction,
        ticket: Ticket,
        result: Result<(), ClientError>,
    },
    Snapshot(SnapshotPayload),
    /// A poll succeeded while no job is running.
    Idle,
    SnapshotFailed(ClientError),
    ResultsFetched {
        batch_id: String,
        result: Result<ResultsPayload, ClientError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: FailureKind,
    pub message: String,
}

impl ClientError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
