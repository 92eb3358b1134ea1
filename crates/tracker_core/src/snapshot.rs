use std::collections::{BTreeMap, BTreeSet};

use crate::BatchId;

/// Aggregate progress of one batch as last reported by the scraping service.
///
/// Snapshots are replaced wholesale on every update and never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSnapshot {
    pub batch_id: BatchId,
    pub total_sites: u32,
    pub completed_sites: u32,
    pub failed_sites: u32,
    pub pending_sites: u32,
    pub active_sites: BTreeSet<String>,
    /// URLs reported as failed; empty when the service does not report them.
    pub failed_urls: BTreeSet<String>,
}

impl JobSnapshot {
    pub fn new(batch_id: impl Into<BatchId>) -> Self {
        Self {
            batch_id: batch_id.into(),
            ..Self::default()
        }
    }

    pub fn is_active(&self, url: &str) -> bool {
        self.active_sites.contains(url)
    }

    pub fn active_count(&self) -> u32 {
        u32::try_from(self.active_sites.len()).unwrap_or(u32::MAX)
    }

    /// Completed share of the batch in whole percent, clamped to 100.
    pub fn percent_complete(&self) -> u8 {
        if self.total_sites == 0 {
            return 0;
        }
        let percent = u64::from(self.completed_sites) * 100 / u64::from(self.total_sites);
        percent.min(100) as u8
    }
}

/// Outcome for a single scraped page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageResult {
    pub success: bool,
    pub title: Option<String>,
    pub record_count: usize,
    pub error: Option<String>,
}

/// Results of a batch keyed by URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    pub batch_id: BatchId,
    pub pages: BTreeMap<String, PageResult>,
}

impl ResultSet {
    pub fn succeeded(&self) -> usize {
        self.pages.values().filter(|page| page.success).count()
    }

    pub fn total_records(&self) -> usize {
        self.pages.values().map(|page| page.record_count).sum()
    }
}
