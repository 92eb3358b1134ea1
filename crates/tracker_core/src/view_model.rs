use chrono::{DateTime, Utc};

use crate::{Action, AppState, BatchId, ItemId, ItemStatus, JobSnapshot, ResultSet};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LastSubmitStats {
    pub enqueued: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub items: Vec<ItemRowView>,
    pub batches: Vec<BatchProgressView>,
    pub item_count: usize,
    pub last_submit_stats: Option<LastSubmitStats>,
    /// Polling for job status is currently failing.
    pub snapshot_stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRowView {
    pub id: ItemId,
    pub url: String,
    pub batch_id: Option<BatchId>,
    pub status: ItemStatus,
    pub badge: &'static str,
    pub available_actions: Vec<Action>,
    pub pending_action: Option<Action>,
    pub has_results: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgressView {
    pub batch_id: BatchId,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub pending: u32,
    pub active: u32,
    pub percent: u8,
    pub results: Option<ResultsSummaryView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsSummaryView {
    pub pages: usize,
    pub succeeded: usize,
    pub records: usize,
}

impl ResultsSummaryView {
    fn from_results(results: &ResultSet) -> Self {
        Self {
            pages: results.pages.len(),
            succeeded: results.succeeded(),
            records: results.total_records(),
        }
    }
}

impl BatchProgressView {
    fn from_snapshot(snapshot: &JobSnapshot, results: Option<&ResultSet>) -> Self {
        Self {
            batch_id: snapshot.batch_id.clone(),
            total: snapshot.total_sites,
            completed: snapshot.completed_sites,
            failed: snapshot.failed_sites,
            pending: snapshot.pending_sites,
            active: snapshot.active_count(),
            percent: snapshot.percent_complete(),
            results: results.map(ResultsSummaryView::from_results),
        }
    }
}

/// Short label shown next to an item.
pub fn badge(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "Queued",
        ItemStatus::Scraping => "In progress",
        ItemStatus::Completed => "Done",
        ItemStatus::Failed => "Failed",
        ItemStatus::Paused => "Paused",
        ItemStatus::Stopped => "Stopped",
    }
}

impl AppState {
    pub fn view(&self) -> AppViewModel {
        let mut items: Vec<ItemRowView> = self
            .items()
            .map(|item| {
                let has_results = item
                    .batch_id
                    .as_deref()
                    .is_some_and(|batch| self.results(batch).is_some());
                // Nothing else may be requested while a call is pending, except delete.
                let available_actions = match item.in_flight {
                    Some(pending) if pending.action == Action::Delete => Vec::new(),
                    Some(_) => vec![Action::Delete],
                    None => Action::available_for(item.status),
                };
                ItemRowView {
                    id: item.id.clone(),
                    url: item.url.clone(),
                    batch_id: item.batch_id.clone(),
                    status: item.status,
                    badge: badge(item.status),
                    available_actions,
                    pending_action: item.in_flight.map(|pending| pending.action),
                    has_results,
                    started_at: item.start_time,
                    ended_at: item.end_time,
                }
            })
            .collect();
        items.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));

        let batches = self
            .snapshots()
            .map(|snapshot| {
                BatchProgressView::from_snapshot(snapshot, self.results(&snapshot.batch_id))
            })
            .collect();

        AppViewModel {
            item_count: items.len(),
            items,
            batches,
            last_submit_stats: self.last_submit_stats().cloned(),
            snapshot_stale: self.snapshot_outage(),
        }
    }
}
