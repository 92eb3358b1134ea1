use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tracker_core::{coalesce_snapshots, update, Action, AppState, Effect, Msg};
use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::effects::EffectRunner;
use crate::persistence;
use crate::render;

const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Drives the pure core: feeds messages through `update`, runs effects and
/// keeps the on-disk item list current.
pub struct App {
    state: AppState,
    runner: EffectRunner,
    state_dir: PathBuf,
    submissions_in_flight: usize,
}

impl App {
    pub fn new(state: AppState, runner: EffectRunner, state_dir: PathBuf) -> Self {
        Self {
            state,
            runner,
            state_dir,
            submissions_in_flight: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Loads persisted items into the state.
    pub fn restore(&mut self) {
        let items = persistence::load_items(&self.state_dir);
        if !items.is_empty() {
            self.dispatch_msg(Msg::RestoreItems(items));
        }
    }

    /// Runs one message through the core; returns whether the view changed.
    pub fn dispatch_msg(&mut self, msg: Msg) -> bool {
        if matches!(
            msg,
            Msg::SubmissionAccepted { .. } | Msg::SubmissionFailed { .. }
        ) {
            self.submissions_in_flight = self.submissions_in_flight.saturating_sub(1);
        }

        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        self.submissions_in_flight += effects
            .iter()
            .filter(|effect| matches!(effect, Effect::SubmitUrls { .. }))
            .count();
        self.runner.enqueue(effects);

        let dirty = self.state.consume_dirty();
        if dirty {
            self.persist();
        }
        dirty
    }

    /// Processes engine events until `done` holds or `timeout` elapses.
    /// Returns whether `done` was reached.
    pub fn run_until(
        &mut self,
        timeout: Option<Duration>,
        mut on_change: impl FnMut(&AppState),
        done: impl Fn(&App) -> bool,
    ) -> bool {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            if done(self) {
                return true;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }

            let mut inbox: Vec<Msg> = self.runner.wait_message(WAIT_SLICE).into_iter().collect();
            inbox.extend(self.runner.poll_messages());
            let mut dirty = false;
            for msg in coalesce_snapshots(inbox) {
                dirty |= self.dispatch_msg(msg);
            }
            if dirty {
                on_change(&self.state);
            }
        }
    }

    pub fn submit(&mut self, raw_urls: &str, timeout: Duration) -> anyhow::Result<()> {
        self.dispatch_msg(Msg::UrlsSubmitted(raw_urls.to_string()));
        if self.submissions_in_flight == 0 {
            tracker_info!("Nothing new to submit");
            return Ok(());
        }
        if !self.run_until(Some(timeout), |_| {}, |app| app.submissions_in_flight == 0) {
            bail!("submission did not finish within {}s", timeout.as_secs());
        }
        Ok(())
    }

    pub fn request_action(
        &mut self,
        item_id: &str,
        action: Action,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        self.dispatch_msg(Msg::ActionRequested {
            item_id: item_id.to_string(),
            action,
        });
        if !self.state.has_in_flight_actions() {
            return Ok(());
        }
        if !self.run_until(Some(timeout), |_| {}, |app| !app.state.has_in_flight_actions()) {
            bail!("{action} on {item_id} did not finish within {}s", timeout.as_secs());
        }
        Ok(())
    }

    /// Polls job snapshots and prints progress until every item settles.
    pub fn watch(&mut self, timeout: Option<Duration>) -> anyhow::Result<()> {
        if self.state.item_count() == 0 {
            println!("No tracked items to watch");
            return Ok(());
        }

        self.runner.start_polling();
        self.print();
        let settled = self.run_until(
            timeout,
            |state| {
                tracker_debug!("View changed; {} item(s)", state.item_count());
                print_lines(render::render(&state.view()));
            },
            |app| app.state.is_settled(),
        );
        self.runner.stop_polling();

        if !settled {
            tracker_warn!("Watch ended before all items settled");
            println!("Stopped watching; some items are still running");
        }
        Ok(())
    }

    pub fn print(&self) {
        print_lines(render::render(&self.state.view()));
    }

    /// Writes the current items to disk; errors are logged.
    fn persist(&self) {
        if let Err(err) = persistence::save_items(&self.state_dir, &self.state.tracked_items_snapshot())
            .with_context(|| format!("saving items to {:?}", self.state_dir))
        {
            tracker_warn!("{:#}", err);
        }
    }
}

fn print_lines(lines: Vec<String>) {
    println!();
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tracker_core::{Action, AppState, ItemStatus};
    use tracker_engine::{
        ClientError, EngineHandle, LifecycleAction, ResultsPayload, ScrapingClient,
        SnapshotPayload, SubmitResponse, SubmittedItem,
    };

    use super::App;
    use crate::effects::EffectRunner;
    use crate::persistence;

    /// Service whose single batch finishes on the first poll.
    #[derive(Default)]
    struct FinishedService {
        dispatched: Mutex<Vec<(String, LifecycleAction)>>,
    }

    #[async_trait::async_trait]
    impl ScrapingClient for FinishedService {
        async fn submit(&self, urls: &[String]) -> Result<SubmitResponse, ClientError> {
            Ok(SubmitResponse {
                batch_id: "b1".to_string(),
                items: urls
                    .iter()
                    .enumerate()
                    .map(|(index, url)| SubmittedItem {
                        id: format!("w{}", index + 1),
                        url: url.clone(),
                    })
                    .collect(),
            })
        }

        async fn dispatch(&self, item_id: &str, action: LifecycleAction) -> Result<(), ClientError> {
            self.dispatched
                .lock()
                .unwrap()
                .push((item_id.to_string(), action));
            Ok(())
        }

        async fn current_snapshot(&self) -> Result<Option<SnapshotPayload>, ClientError> {
            Ok(Some(SnapshotPayload {
                batch_id: "b1".to_string(),
                total_sites: 2,
                completed_sites: 2,
                failed_sites: 0,
                pending_sites: 0,
                active_sites: Vec::new(),
                failed_urls: Vec::new(),
            }))
        }

        async fn fetch_results(&self, batch_id: &str) -> Result<ResultsPayload, ClientError> {
            Ok(ResultsPayload {
                batch_id: batch_id.to_string(),
                results: Default::default(),
            })
        }
    }

    fn app_with(service: Arc<FinishedService>, temp: &TempDir) -> App {
        tracker_logging::initialize_for_tests();
        let engine = EngineHandle::with_client(service, Duration::from_millis(10));
        App::new(
            AppState::new(),
            EffectRunner::new(engine),
            temp.path().to_path_buf(),
        )
    }

    #[test]
    fn submit_tracks_and_persists_new_items() {
        let temp = TempDir::new().unwrap();
        let mut app = app_with(Arc::new(FinishedService::default()), &temp);

        app.submit("http://a.com http://b.com http://a.com/", Duration::from_secs(5))
            .unwrap();

        assert_eq!(app.state().item_count(), 2);
        let saved = persistence::load_items(temp.path());
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|item| item.status == ItemStatus::Pending));
    }

    #[test]
    fn watch_settles_once_batch_completes() {
        let temp = TempDir::new().unwrap();
        let mut app = app_with(Arc::new(FinishedService::default()), &temp);
        app.submit("http://a.com http://b.com", Duration::from_secs(5))
            .unwrap();

        app.watch(Some(Duration::from_secs(5))).unwrap();

        assert!(app.state().is_settled());
        assert!(app
            .state()
            .items()
            .all(|item| item.status == ItemStatus::Completed));
        assert!(app.state().results("b1").is_some());
    }

    #[test]
    fn actions_reach_the_service_and_update_status() {
        let temp = TempDir::new().unwrap();
        let service = Arc::new(FinishedService::default());
        let mut app = app_with(service.clone(), &temp);
        app.submit("http://a.com", Duration::from_secs(5)).unwrap();

        app.request_action("w1", Action::Pause, Duration::from_secs(5))
            .unwrap();
        assert_eq!(app.state().item("w1").unwrap().status, ItemStatus::Paused);

        app.request_action("w1", Action::Delete, Duration::from_secs(5))
            .unwrap();
        assert!(app.state().item("w1").is_none());
        assert!(persistence::load_items(temp.path()).is_empty());

        assert_eq!(
            service.dispatched.lock().unwrap().clone(),
            vec![
                ("w1".to_string(), LifecycleAction::Pause),
                ("w1".to_string(), LifecycleAction::Delete),
            ]
        );
    }

    #[test]
    fn unavailable_action_makes_no_call() {
        let temp = TempDir::new().unwrap();
        let service = Arc::new(FinishedService::default());
        let mut app = app_with(service.clone(), &temp);
        app.submit("http://a.com", Duration::from_secs(5)).unwrap();

        app.request_action("w1", Action::Resume, Duration::from_secs(1))
            .unwrap();
        assert_eq!(app.state().item("w1").unwrap().status, ItemStatus::Pending);
        assert!(service.dispatched.lock().unwrap().is_empty());
    }

    #[test]
    fn restore_reloads_saved_items() {
        let temp = TempDir::new().unwrap();
        {
            let mut app = app_with(Arc::new(FinishedService::default()), &temp);
            app.submit("http://a.com", Duration::from_secs(5)).unwrap();
        }

        let mut app = app_with(Arc::new(FinishedService::default()), &temp);
        app.restore();
        assert_eq!(app.state().item("w1").map(|item| item.url.as_str()), Some("http://a.com"));
    }
}
