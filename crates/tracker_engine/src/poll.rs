use std::sync::{mpsc, Arc};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_debug, tracker_warn};

use crate::{EngineEvent, ScrapingClient};

/// Polls the current job snapshot until cancelled or the receiver goes away.
///
/// Ticks missed while a request is outstanding are skipped rather than
/// bunched up, so a slow service is never asked twice in a row.
pub(crate) async fn poll_snapshots(
    client: Arc<dyn ScrapingClient>,
    interval: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = client.current_snapshot() => result,
        };

        let event = match result {
            Ok(Some(snapshot)) => EngineEvent::Snapshot(snapshot),
            Ok(None) => {
                tracker_debug!("No scraping job running");
                EngineEvent::Idle
            }
            Err(err) => {
                tracker_warn!("Snapshot poll failed: {}", err);
                EngineEvent::SnapshotFailed(err)
            }
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
    tracker_debug!("Snapshot polling stopped");
}
