use crate::{FailureScope, ItemStatus, JobSnapshot, TrackedItem};

/// Derive an item's status from the latest snapshot of its batch.
///
/// Returns the item's current status when there is no snapshot or the snapshot
/// belongs to another batch. Otherwise the first matching rule wins:
/// failure, active, batch complete, still pending, else unchanged.
pub fn classify(
    item: &TrackedItem,
    snapshot: Option<&JobSnapshot>,
    scope: FailureScope,
) -> ItemStatus {
    let Some(snapshot) = snapshot else {
        return item.status;
    };
    if !item.in_batch(&snapshot.batch_id) {
        return item.status;
    }

    let active = snapshot.is_active(&item.url);
    let failed = match scope {
        FailureScope::Batch => snapshot.failed_sites > 0 && active,
        FailureScope::Item => snapshot.failed_urls.contains(&item.url),
    };

    if failed {
        ItemStatus::Failed
    } else if active {
        ItemStatus::Scraping
    } else if snapshot.completed_sites == snapshot.total_sites {
        ItemStatus::Completed
    } else if snapshot.pending_sites > 0 {
        ItemStatus::Pending
    } else {
        item.status
    }
}
