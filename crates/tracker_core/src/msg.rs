use chrono::{DateTime, Utc};

use crate::{Action, BatchId, ItemId, JobSnapshot, ResultSet, Ticket, TrackedItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted raw URL input (one or more URLs separated by whitespace).
    UrlsSubmitted(String),
    /// The service accepted a submission and assigned item ids.
    SubmissionAccepted {
        batch_id: BatchId,
        items: Vec<(ItemId, String)>,
        at: DateTime<Utc>,
    },
    /// The submission call failed.
    SubmissionFailed { message: String },
    /// Restore previously tracked items from persisted state.
    RestoreItems(Vec<TrackedItem>),
    /// A new job snapshot arrived from the service.
    SnapshotReceived {
        snapshot: JobSnapshot,
        at: DateTime<Utc>,
    },
    /// Polling for the current snapshot failed.
    SnapshotUnavailable { message: String },
    /// User asked for a lifecycle action on an item.
    ActionRequested { item_id: ItemId, action: Action },
    /// Remote call for an action succeeded.
    ActionSucceeded {
        item_id: ItemId,
        action: Action,
        ticket: Ticket,
    },
    /// Remote call for an action failed.
    ActionFailed {
        item_id: ItemId,
        action: Action,
        ticket: Ticket,
        message: String,
    },
    /// Results fetch for a batch finished.
    ResultsFetched {
        batch_id: BatchId,
        result: Result<ResultSet, String>,
    },
    /// A poll succeeded but the service has no job running.
    ServiceIdle,
}

/// Drops every snapshot that is followed by a newer one for the same batch.
///
/// Only the latest aggregate state matters, so a backlog of snapshots collapses
/// to the last one per batch while other messages keep their order.
pub fn coalesce_snapshots(inbox: Vec<Msg>) -> Vec<Msg> {
    let mut keep = vec![true; inbox.len()];
    let mut seen: Vec<&str> = Vec::new();
    for (index, msg) in inbox.iter().enumerate().rev() {
        if let Msg::SnapshotReceived { snapshot, .. } = msg {
            if seen.contains(&snapshot.batch_id.as_str()) {
                keep[index] = false;
            } else {
                seen.push(&snapshot.batch_id);
            }
        }
    }

    inbox
        .into_iter()
        .zip(keep)
        .filter_map(|(msg, keep)| keep.then_some(msg))
        .collect()
}
