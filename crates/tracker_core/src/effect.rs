use crate::{Action, BatchId, ItemId, Ticket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the given URLs to the scraping service as a new batch.
    SubmitUrls { urls: Vec<String> },
    /// Issue exactly one remote call for an accepted action.
    DispatchAction {
        item_id: ItemId,
        url: String,
        action: Action,
        ticket: Ticket,
    },
    /// Abort a superseded action call; its answer is ignored either way.
    CancelAction { item_id: ItemId, ticket: Ticket },
    FetchResults { batch_id: BatchId },
    Notify(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Non-blocking, user-visible message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}
