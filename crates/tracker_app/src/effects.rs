use chrono::{DateTime, Utc};
use tracker_core::{
    Action, Effect, JobSnapshot, Msg, Notification, NotificationLevel, PageResult, ResultSet,
};
use tracker_engine::{
    EngineEvent, EngineHandle, LifecycleAction, ResultsPayload, SnapshotPayload,
};
use tracker_logging::{tracker_error, tracker_info, tracker_warn};

/// Executes core effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitUrls { urls } => {
                    tracker_info!("SubmitUrls count={}", urls.len());
                    self.engine.submit(urls);
                }
                Effect::DispatchAction {
                    item_id,
                    url,
                    action,
                    ticket,
                } => {
                    tracker_info!(
                        "DispatchAction item={} action={} ticket={} url={}",
                        item_id,
                        action,
                        ticket,
                        url
                    );
                    self.engine.dispatch(item_id, map_action(action), ticket);
                }
                Effect::CancelAction { item_id, ticket } => {
                    tracker_info!("CancelAction item={} ticket={}", item_id, ticket);
                    self.engine.cancel(ticket);
                }
                Effect::FetchResults { batch_id } => {
                    tracker_info!("FetchResults batch={}", batch_id);
                    self.engine.fetch_results(batch_id);
                }
                Effect::Notify(notification) => notify(&notification),
            }
        }
    }

    pub fn start_polling(&self) {
        self.engine.start_polling();
    }

    pub fn stop_polling(&self) {
        self.engine.stop_polling();
    }

    /// Drains every event the engine has produced so far.
    pub fn poll_messages(&self) -> Vec<Msg> {
        let mut messages = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            messages.push(map_event(event, Utc::now()));
        }
        messages
    }

    /// Blocks up to `timeout` for one event.
    pub fn wait_message(&self, timeout: std::time::Duration) -> Option<Msg> {
        self.engine
            .recv_timeout(timeout)
            .map(|event| map_event(event, Utc::now()))
    }
}

fn notify(notification: &Notification) {
    match notification.level {
        NotificationLevel::Info => {
            tracker_info!("{}", notification.message);
            eprintln!("[info] {}", notification.message);
        }
        NotificationLevel::Warning => {
            tracker_warn!("{}", notification.message);
            eprintln!("[warning] {}", notification.message);
        }
        NotificationLevel::Error => {
            tracker_error!("{}", notification.message);
            eprintln!("[error] {}", notification.message);
        }
    }
}

pub fn map_action(action: Action) -> LifecycleAction {
    match action {
        Action::Pause => LifecycleAction::Pause,
        Action::Resume => LifecycleAction::Resume,
        Action::Stop => LifecycleAction::Stop,
        Action::Retry => LifecycleAction::Retry,
        Action::Delete => LifecycleAction::Delete,
    }
}

fn map_lifecycle(action: LifecycleAction) -> Action {
    match action {
        LifecycleAction::Pause => Action::Pause,
        LifecycleAction::Resume => Action::Resume,
        LifecycleAction::Stop => Action::Stop,
        LifecycleAction::Retry => Action::Retry,
        LifecycleAction::Delete => Action::Delete,
    }
}

pub fn map_event(event: EngineEvent, at: DateTime<Utc>) -> Msg {
    match event {
        EngineEvent::Submitted(Ok(response)) => Msg::SubmissionAccepted {
            batch_id: response.batch_id,
            items: response
                .items
                .into_iter()
                .map(|item| (item.id, item.url))
                .collect(),
            at,
        },
        EngineEvent::Submitted(Err(err)) => Msg::SubmissionFailed {
            message: err.to_string(),
        },
        EngineEvent::ActionCompleted {
            item_id,
            action,
            ticket,
            result,
        } => match result {
            Ok(()) => Msg::ActionSucceeded {
                item_id,
                action: map_lifecycle(action),
                ticket,
            },
            Err(err) => Msg::ActionFailed {
                item_id,
                action: map_lifecycle(action),
                ticket,
                message: err.to_string(),
            },
        },
        EngineEvent::Snapshot(payload) => Msg::SnapshotReceived {
            snapshot: map_snapshot(payload),
            at,
        },
        EngineEvent::Idle => Msg::ServiceIdle,
        EngineEvent::SnapshotFailed(err) => Msg::SnapshotUnavailable {
            message: err.to_string(),
        },
        EngineEvent::ResultsFetched { batch_id, result } => Msg::ResultsFetched {
            batch_id,
            result: result.map(map_results).map_err(|err| err.to_string()),
        },
    }
}

fn map_snapshot(payload: SnapshotPayload) -> JobSnapshot {
    JobSnapshot {
        batch_id: payload.batch_id,
        total_sites: payload.total_sites,
        completed_sites: payload.completed_sites,
        failed_sites: payload.failed_sites,
        pending_sites: payload.pending_sites,
        active_sites: payload.active_sites.into_iter().collect(),
        failed_urls: payload.failed_urls.into_iter().collect(),
    }
}

fn map_results(payload: ResultsPayload) -> ResultSet {
    ResultSet {
        batch_id: payload.batch_id,
        pages: payload
            .results
            .into_iter()
            .map(|(url, page)| {
                let result = PageResult {
                    success: page.success,
                    title: page.title.clone(),
                    record_count: page.record_count(),
                    error: page.error.clone(),
                };
                (url, result)
            })
            .collect(),
    }
}
