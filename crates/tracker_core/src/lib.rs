//! Tracker core: pure status state machine, reconciliation and view-model helpers.
mod classify;
mod effect;
mod msg;
mod snapshot;
mod state;
mod status;
mod update;
mod view_model;

pub use classify::classify;
pub use effect::{Effect, Notification, NotificationLevel};
pub use msg::{coalesce_snapshots, Msg};
pub use snapshot::{JobSnapshot, PageResult, ResultSet};
pub use state::{
    normalize_url_for_dedupe, AppState, BatchId, InFlightAction, ItemId, Ticket, TrackedItem,
};
pub use status::{Action, FailureScope, ItemStatus};
pub use update::update;
pub use view_model::{
    badge, AppViewModel, BatchProgressView, ItemRowView, LastSubmitStats, ResultsSummaryView,
};
