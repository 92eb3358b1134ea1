use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use url::Url;

use crate::view_model::LastSubmitStats;
use crate::{classify, Action, FailureScope, ItemStatus, JobSnapshot, ResultSet};

pub type ItemId = String;
pub type BatchId = String;
/// Monotonic sequence number identifying one accepted action call.
pub type Ticket = u64;

/// Action call awaiting an answer from the scraping service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightAction {
    pub action: Action,
    pub ticket: Ticket,
}

/// A unit of work (one website) tracked by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedItem {
    pub id: ItemId,
    pub url: String,
    pub batch_id: Option<BatchId>,
    pub status: ItemStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub in_flight: Option<InFlightAction>,
}

impl TrackedItem {
    pub fn new(
        id: impl Into<ItemId>,
        url: impl Into<String>,
        batch_id: Option<BatchId>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            batch_id,
            status: ItemStatus::Pending,
            start_time,
            end_time: None,
            in_flight: None,
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn in_batch(&self, batch_id: &str) -> bool {
        self.batch_id.as_deref() == Some(batch_id)
    }

    /// Moves to a non-completed status; `end_time` only survives while completed.
    pub(crate) fn set_status(&mut self, status: ItemStatus) {
        debug_assert!(status != ItemStatus::Completed, "use mark_completed");
        self.status = status;
        self.end_time = None;
    }

    pub(crate) fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = ItemStatus::Completed;
        self.end_time = Some(at);
    }
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ReconcileOutcome {
    pub changed: usize,
    /// Items that transitioned into `completed` during this pass.
    pub completed: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    items: BTreeMap<ItemId, TrackedItem>,
    snapshots: BTreeMap<BatchId, JobSnapshot>,
    results: BTreeMap<BatchId, ResultSet>,
    results_pending: BTreeSet<BatchId>,
    failure_scope: FailureScope,
    next_ticket: Ticket,
    last_submit_stats: Option<LastSubmitStats>,
    snapshot_outage: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_scope(mut self, scope: FailureScope) -> Self {
        self.failure_scope = scope;
        self
    }

    pub fn failure_scope(&self) -> FailureScope {
        self.failure_scope
    }

    pub fn item(&self, id: &str) -> Option<&TrackedItem> {
        self.items.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &TrackedItem> {
        self.items.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn snapshot(&self, batch_id: &str) -> Option<&JobSnapshot> {
        self.snapshots.get(batch_id)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &JobSnapshot> {
        self.snapshots.values()
    }

    pub fn results(&self, batch_id: &str) -> Option<&ResultSet> {
        self.results.get(batch_id)
    }

    pub fn results_pending(&self, batch_id: &str) -> bool {
        self.results_pending.contains(batch_id)
    }

    /// Copies of every tracked item without their in-flight bookkeeping,
    /// suitable for persisting and restoring later.
    pub fn tracked_items_snapshot(&self) -> Vec<TrackedItem> {
        self.items
            .values()
            .cloned()
            .map(|mut item| {
                item.in_flight = None;
                item
            })
            .collect()
    }

    /// True when nothing is in flight and every item sits in a settled status.
    pub fn is_settled(&self) -> bool {
        self.results_pending.is_empty()
            && self
                .items
                .values()
                .all(|item| item.in_flight.is_none() && item.status.is_settled())
    }

    pub fn has_in_flight_actions(&self) -> bool {
        self.items.values().any(|item| item.in_flight.is_some())
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn last_submit_stats(&self) -> Option<&LastSubmitStats> {
        self.last_submit_stats.as_ref()
    }

    pub(crate) fn set_last_submit_stats(&mut self, enqueued: usize, skipped: usize) {
        self.last_submit_stats = Some(LastSubmitStats { enqueued, skipped });
        self.mark_dirty();
    }

    pub(crate) fn item_mut(&mut self, id: &str) -> Option<&mut TrackedItem> {
        self.items.get_mut(id)
    }

    /// Reclassifies every item of the snapshot's batch against that one snapshot.
    ///
    /// Completed items and items with an action in flight keep their status.
    /// Only items whose status actually changes are written.
    pub(crate) fn reconcile(
        &mut self,
        snapshot: &JobSnapshot,
        at: DateTime<Utc>,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let scope = self.failure_scope;

        for item in self
            .items
            .values_mut()
            .filter(|item| item.in_batch(&snapshot.batch_id))
        {
            if item.status.is_terminal() || item.in_flight.is_some() {
                continue;
            }
            let next = classify(item, Some(snapshot), scope);
            if next == item.status {
                continue;
            }
            if next == ItemStatus::Completed {
                item.mark_completed(at);
                outcome.completed.push(item.id.clone());
            } else {
                item.set_status(next);
            }
            outcome.changed += 1;
        }

        if outcome.changed > 0 {
            self.mark_dirty();
        }
        outcome
    }

    /// Inserts an item unless its id is already tracked. Returns whether it was added.
    pub(crate) fn insert_item(&mut self, item: TrackedItem) -> bool {
        if self.items.contains_key(&item.id) {
            return false;
        }
        self.items.insert(item.id.clone(), item);
        self.mark_dirty();
        true
    }

    /// Removes an item; a batch left without items loses its snapshot and results.
    pub(crate) fn remove_item(&mut self, id: &str) -> Option<TrackedItem> {
        let removed = self.items.remove(id)?;
        if let Some(batch_id) = removed.batch_id.as_deref() {
            if !self.tracks_batch(batch_id) {
                self.snapshots.remove(batch_id);
                self.results.remove(batch_id);
                self.results_pending.remove(batch_id);
            }
        }
        self.mark_dirty();
        Some(removed)
    }

    /// Whether any tracked item belongs to the batch.
    pub(crate) fn tracks_batch(&self, batch_id: &str) -> bool {
        self.items.values().any(|item| item.in_batch(batch_id))
    }

    /// Whether a URL is already tracked, compared after normalization.
    pub(crate) fn is_url_tracked(&self, normalized: &str) -> bool {
        self.items
            .values()
            .any(|item| normalize_url_for_dedupe(&item.url) == normalized)
    }

    /// Replaces the mirrored snapshot for its batch. Returns whether it differed.
    /// Snapshots of batches without tracked items are not kept.
    pub(crate) fn replace_snapshot(&mut self, snapshot: JobSnapshot) -> bool {
        if !self.tracks_batch(&snapshot.batch_id) {
            return false;
        }
        let changed = self.snapshots.get(&snapshot.batch_id) != Some(&snapshot);
        self.snapshots.insert(snapshot.batch_id.clone(), snapshot);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub(crate) fn next_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Marks a results fetch as outstanding. Returns false when one already is.
    pub(crate) fn begin_results_fetch(&mut self, batch_id: &str) -> bool {
        self.results_pending.insert(batch_id.to_string())
    }

    pub(crate) fn finish_results_fetch(&mut self, batch_id: &str) {
        self.results_pending.remove(batch_id);
    }

    pub(crate) fn store_results(&mut self, results: ResultSet) {
        self.results.insert(results.batch_id.clone(), results);
        self.mark_dirty();
    }

    /// Records the poller's health. Returns true when an outage just started.
    pub(crate) fn set_snapshot_outage(&mut self, outage: bool) -> bool {
        let started = outage && !self.snapshot_outage;
        self.snapshot_outage = outage;
        started
    }

    pub(crate) fn snapshot_outage(&self) -> bool {
        self.snapshot_outage
    }
}

/// Normalize a URL for duplicate detection: trims whitespace, lower-cases the
/// scheme and host and drops a trailing slash. Unparseable input is lower-cased.
pub fn normalize_url_for_dedupe(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(parsed) => parsed.as_str().trim_end_matches('/').to_string(),
        Err(_) => trimmed.trim_end_matches('/').to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_url_for_dedupe;

    #[test]
    fn normalization_folds_case_and_trailing_slash() {
        assert_eq!(
            normalize_url_for_dedupe("  HTTPS://Example.COM/ "),
            normalize_url_for_dedupe("https://example.com")
        );
        assert_eq!(normalize_url_for_dedupe("Careers.Example.com/"), "careers.example.com");
    }

    #[test]
    fn normalization_keeps_path_case() {
        assert_ne!(
            normalize_url_for_dedupe("https://example.com/Jobs"),
            normalize_url_for_dedupe("https://example.com/jobs")
        );
    }
}
