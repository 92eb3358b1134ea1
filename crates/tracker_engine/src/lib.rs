//! Tracker engine: HTTP client for the scraping service and effect execution.
mod client;
mod engine;
mod poll;
mod types;

pub use client::{ClientSettings, ReqwestScrapingClient, ScrapingClient};
pub use engine::EngineHandle;
pub use types::{
    ClientError, EngineEvent, FailureKind, LifecycleAction, PageResultPayload, ResultsPayload,
    SnapshotPayload, SubmitResponse, SubmittedItem, Ticket,
};
