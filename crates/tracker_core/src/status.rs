use std::fmt;

/// Lifecycle status of a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ItemStatus {
    #[default]
    Pending,
    Scraping,
    Completed,
    Failed,
    Paused,
    Stopped,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 6] = [
        ItemStatus::Pending,
        ItemStatus::Scraping,
        ItemStatus::Completed,
        ItemStatus::Failed,
        ItemStatus::Paused,
        ItemStatus::Stopped,
    ];

    /// No automatic transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Completed)
    }

    /// Statuses in which a watcher has nothing left to wait for.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Stopped | ItemStatus::Paused
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Scraping => "scraping",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
            ItemStatus::Paused => "paused",
            ItemStatus::Stopped => "stopped",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-initiated lifecycle action on a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Pause,
    Resume,
    Stop,
    Retry,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Pause,
        Action::Resume,
        Action::Stop,
        Action::Retry,
        Action::Delete,
    ];

    /// Availability guard for the action given the item's current status.
    pub fn is_available_for(self, status: ItemStatus) -> bool {
        match self {
            Action::Pause | Action::Stop => {
                matches!(status, ItemStatus::Scraping | ItemStatus::Pending)
            }
            Action::Resume => status == ItemStatus::Paused,
            Action::Retry => matches!(status, ItemStatus::Failed | ItemStatus::Stopped),
            Action::Delete => true,
        }
    }

    /// Status the item takes once the remote call succeeds; `None` for delete,
    /// which removes the item instead.
    pub fn resulting_status(self) -> Option<ItemStatus> {
        match self {
            Action::Pause => Some(ItemStatus::Paused),
            Action::Resume => Some(ItemStatus::Scraping),
            Action::Stop => Some(ItemStatus::Stopped),
            Action::Retry => Some(ItemStatus::Pending),
            Action::Delete => None,
        }
    }

    /// Actions offered for an item in the given status, in display order.
    pub fn available_for(status: ItemStatus) -> Vec<Action> {
        Self::ALL
            .into_iter()
            .filter(|action| action.is_available_for(status))
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Stop => "stop",
            Action::Retry => "retry",
            Action::Delete => "delete",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the classifier decides that an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureScope {
    /// Any failure in the batch marks every currently active item as failed.
    #[default]
    Batch,
    /// Only items listed in the snapshot's failed URLs are marked failed.
    Item,
}

impl FailureScope {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "batch" => Some(Self::Batch),
            "item" => Some(Self::Item),
            _ => None,
        }
    }
}
