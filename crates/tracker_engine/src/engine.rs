use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_error, tracker_info};

use crate::client::{ClientSettings, ReqwestScrapingClient, ScrapingClient};
use crate::poll::poll_snapshots;
use crate::{ClientError, EngineEvent, FailureKind, LifecycleAction, Ticket};

enum EngineCommand {
    Submit {
        urls: Vec<String>,
    },
    Dispatch {
        item_id: String,
        action: LifecycleAction,
        ticket: Ticket,
    },
    Cancel {
        ticket: Ticket,
    },
    FetchResults {
        batch_id: String,
    },
    StartPolling {
        interval: Duration,
    },
    StopPolling,
}

struct InFlightCall {
    item_id: String,
    action: LifecycleAction,
    handle: AbortHandle,
}

/// Handle to the background engine thread that owns all network IO.
///
/// Commands are queued without blocking; outcomes come back as [`EngineEvent`]s.
/// Dropping the handle shuts the engine down and aborts outstanding calls.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    poll_interval: Duration,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let client = ReqwestScrapingClient::new(&settings)?;
        Ok(Self::with_client(Arc::new(client), settings.poll_interval))
    }

    pub fn with_client(client: Arc<dyn ScrapingClient>, poll_interval: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracker_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let mut worker = Worker {
                client,
                event_tx,
                in_flight: HashMap::new(),
                poller: None,
            };
            while let Ok(command) = cmd_rx.recv() {
                worker.handle(&runtime, command);
            }
            worker.stop_polling();
        });

        Self {
            cmd_tx,
            event_rx,
            poll_interval,
        }
    }

    pub fn submit(&self, urls: Vec<String>) {
        self.send(EngineCommand::Submit { urls });
    }

    pub fn dispatch(&self, item_id: impl Into<String>, action: LifecycleAction, ticket: Ticket) {
        self.send(EngineCommand::Dispatch {
            item_id: item_id.into(),
            action,
            ticket,
        });
    }

    pub fn cancel(&self, ticket: Ticket) {
        self.send(EngineCommand::Cancel { ticket });
    }

    pub fn fetch_results(&self, batch_id: impl Into<String>) {
        self.send(EngineCommand::FetchResults {
            batch_id: batch_id.into(),
        });
    }

    pub fn start_polling(&self) {
        self.send(EngineCommand::StartPolling {
            interval: self.poll_interval,
        });
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            tracker_error!("Engine thread is gone; command dropped");
        }
    }
}

struct Worker {
    client: Arc<dyn ScrapingClient>,
    event_tx: mpsc::Sender<EngineEvent>,
    in_flight: HashMap<Ticket, InFlightCall>,
    poller: Option<CancellationToken>,
}

impl Worker {
    fn handle(&mut self, runtime: &tokio::runtime::Runtime, command: EngineCommand) {
        match command {
            EngineCommand::Submit { urls } => {
                let client = self.client.clone();
                let event_tx = self.event_tx.clone();
                runtime.spawn(async move {
                    tracker_info!("Submitting {} url(s)", urls.len());
                    let result = client.submit(&urls).await;
                    let _ = event_tx.send(EngineEvent::Submitted(result));
                });
            }
            EngineCommand::Dispatch {
                item_id,
                action,
                ticket,
            } => {
                self.in_flight.retain(|_, call| !call.handle.is_finished());
                let client = self.client.clone();
                let event_tx = self.event_tx.clone();
                let task_item_id = item_id.clone();
                let task = runtime.spawn(async move {
                    tracker_info!("Dispatch {} item={} ticket={}", action, task_item_id, ticket);
                    let result = client.dispatch(&task_item_id, action).await;
                    let _ = event_tx.send(EngineEvent::ActionCompleted {
                        item_id: task_item_id,
                        action,
                        ticket,
                        result,
                    });
                });
                self.in_flight.insert(
                    ticket,
                    InFlightCall {
                        item_id,
                        action,
                        handle: task.abort_handle(),
                    },
                );
            }
            EngineCommand::Cancel { ticket } => {
                let Some(call) = self.in_flight.remove(&ticket) else {
                    return;
                };
                if call.handle.is_finished() {
                    return;
                }
                call.handle.abort();
                tracker_info!("Cancelled {} item={} ticket={}", call.action, call.item_id, ticket);
                let _ = self.event_tx.send(EngineEvent::ActionCompleted {
                    item_id: call.item_id,
                    action: call.action,
                    ticket,
                    result: Err(ClientError::new(FailureKind::Cancelled, "superseded")),
                });
            }
            EngineCommand::FetchResults { batch_id } => {
                let client = self.client.clone();
                let event_tx = self.event_tx.clone();
                runtime.spawn(async move {
                    let result = client.fetch_results(&batch_id).await;
                    let _ = event_tx.send(EngineEvent::ResultsFetched { batch_id, result });
                });
            }
            EngineCommand::StartPolling { interval } => {
                self.stop_polling();
                let token = CancellationToken::new();
                runtime.spawn(poll_snapshots(
                    self.client.clone(),
                    interval,
                    token.clone(),
                    self.event_tx.clone(),
                ));
                self.poller = Some(token);
            }
            EngineCommand::StopPolling => self.stop_polling(),
        }
    }

    fn stop_polling(&mut self) {
        if let Some(token) = self.poller.take() {
            token.cancel();
        }
    }
}
