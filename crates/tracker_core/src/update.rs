use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::{
    normalize_url_for_dedupe, Action, AppState, Effect, InFlightAction, JobSnapshot, Msg,
    Notification, ResultSet, Ticket, TrackedItem,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::UrlsSubmitted(raw) => submit_urls(&mut state, &raw),
        Msg::SubmissionAccepted {
            batch_id,
            items,
            at,
        } => {
            let mut added = 0;
            for (id, url) in items {
                let item = TrackedItem::new(id, url, Some(batch_id.clone()), at);
                if state.insert_item(item) {
                    added += 1;
                }
            }
            vec![Effect::Notify(Notification::info(format!(
                "Batch {batch_id} accepted with {added} site(s)"
            )))]
        }
        Msg::SubmissionFailed { message } => vec![Effect::Notify(Notification::error(format!(
            "Failed to submit URLs: {message}"
        )))],
        Msg::RestoreItems(items) => {
            for mut item in items {
                item.in_flight = None;
                state.insert_item(item);
            }
            Vec::new()
        }
        Msg::SnapshotReceived { snapshot, at } => {
            clear_outage(&mut state);
            reconcile_snapshot(&mut state, snapshot, at)
        }
        Msg::SnapshotUnavailable { message } => {
            if state.set_snapshot_outage(true) {
                state.mark_dirty();
                vec![Effect::Notify(Notification::warning(format!(
                    "Job status unavailable: {message}"
                )))]
            } else {
                Vec::new()
            }
        }
        Msg::ActionRequested { item_id, action } => request_action(&mut state, item_id, action),
        Msg::ActionSucceeded {
            item_id,
            action,
            ticket,
        } => apply_action_success(&mut state, &item_id, action, ticket),
        Msg::ActionFailed {
            item_id,
            action,
            ticket,
            message,
        } => apply_action_failure(&mut state, &item_id, action, ticket, &message),
        Msg::ResultsFetched { batch_id, result } => {
            state.finish_results_fetch(&batch_id);
            apply_results(&mut state, batch_id, result)
        }
        Msg::ServiceIdle => {
            clear_outage(&mut state);
            Vec::new()
        }
    };

    (state, effects)
}

fn submit_urls(state: &mut AppState, raw: &str) -> Vec<Effect> {
    let urls = parse_urls(raw);
    if urls.is_empty() {
        return Vec::new();
    }

    let mut seen = BTreeSet::new();
    let mut fresh = Vec::with_capacity(urls.len());
    let mut skipped = 0;
    for url in urls {
        let key = normalize_url_for_dedupe(&url);
        if state.is_url_tracked(&key) || !seen.insert(key) {
            skipped += 1;
            continue;
        }
        fresh.push(url);
    }

    state.set_last_submit_stats(fresh.len(), skipped);
    if fresh.is_empty() {
        return Vec::new();
    }
    vec![Effect::SubmitUrls { urls: fresh }]
}

fn parse_urls(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(ToOwned::to_owned).collect()
}

/// Any successful poll ends an outage.
fn clear_outage(state: &mut AppState) {
    if state.snapshot_outage() {
        state.set_snapshot_outage(false);
        state.mark_dirty();
    }
}

fn reconcile_snapshot(state: &mut AppState, snapshot: JobSnapshot, at: DateTime<Utc>) -> Vec<Effect> {
    let outcome = state.reconcile(&snapshot, at);
    let batch_id = snapshot.batch_id.clone();
    state.replace_snapshot(snapshot);

    // One fetch per batch covers every item that completed in this pass.
    if !outcome.completed.is_empty() && state.begin_results_fetch(&batch_id) {
        vec![Effect::FetchResults { batch_id }]
    } else {
        Vec::new()
    }
}

fn request_action(state: &mut AppState, item_id: String, action: Action) -> Vec<Effect> {
    let Some(item) = state.item(&item_id) else {
        return vec![Effect::Notify(Notification::error(format!(
            "Cannot {action} unknown item {item_id}"
        )))];
    };

    if !action.is_available_for(item.status) {
        return vec![Effect::Notify(Notification::warning(format!(
            "Cannot {action} {} ({item_id}) while {}",
            item.url, item.status
        )))];
    }

    // Delete supersedes whatever else is pending; anything else waits its turn.
    let superseded = item.in_flight;
    if let Some(pending) = superseded {
        if action != Action::Delete || pending.action == Action::Delete {
            return vec![Effect::Notify(Notification::warning(format!(
                "Cannot {action} {} ({item_id}): {} already pending",
                item.url, pending.action
            )))];
        }
    }

    let url = item.url.clone();
    let ticket = state.next_ticket();
    if let Some(item) = state.item_mut(&item_id) {
        item.in_flight = Some(InFlightAction { action, ticket });
    }
    state.mark_dirty();

    let mut effects = Vec::with_capacity(2);
    if let Some(pending) = superseded {
        effects.push(Effect::CancelAction {
            item_id: item_id.clone(),
            ticket: pending.ticket,
        });
    }
    effects.push(Effect::DispatchAction {
        item_id,
        url,
        action,
        ticket,
    });
    effects
}

/// Takes the in-flight action off the item when the answer is current.
/// Returns the item's URL, or `None` for stale answers.
fn settle_in_flight(state: &mut AppState, item_id: &str, ticket: Ticket) -> Option<String> {
    let item = state.item_mut(item_id)?;
    match item.in_flight {
        Some(InFlightAction { ticket: current, .. }) if current == ticket => {
            item.in_flight = None;
            Some(item.url.clone())
        }
        _ => None,
    }
}

fn apply_action_success(
    state: &mut AppState,
    item_id: &str,
    action: Action,
    ticket: Ticket,
) -> Vec<Effect> {
    let Some(url) = settle_in_flight(state, item_id, ticket) else {
        return Vec::new();
    };

    match action.resulting_status() {
        Some(status) => {
            if let Some(item) = state.item_mut(item_id) {
                item.set_status(status);
            }
            state.mark_dirty();
        }
        None => {
            state.remove_item(item_id);
        }
    }

    vec![Effect::Notify(Notification::info(format!(
        "{} {url} ({item_id})",
        past_tense(action)
    )))]
}

fn apply_action_failure(
    state: &mut AppState,
    item_id: &str,
    action: Action,
    ticket: Ticket,
    message: &str,
) -> Vec<Effect> {
    let Some(url) = settle_in_flight(state, item_id, ticket) else {
        return Vec::new();
    };
    state.mark_dirty();

    vec![Effect::Notify(Notification::error(format!(
        "Failed to {action} {url} ({item_id}): {message}"
    )))]
}

fn apply_results(
    state: &mut AppState,
    batch_id: String,
    result: Result<ResultSet, String>,
) -> Vec<Effect> {
    // Every item of the batch was deleted while the fetch ran.
    if !state.tracks_batch(&batch_id) {
        return Vec::new();
    }
    match result {
        Ok(results) => {
            let message = format!(
                "Results ready for batch {batch_id}: {}/{} page(s) succeeded",
                results.succeeded(),
                results.pages.len()
            );
            state.store_results(results);
            vec![Effect::Notify(Notification::info(message))]
        }
        Err(message) => {
            state.mark_dirty();
            vec![Effect::Notify(Notification::warning(format!(
                "Could not load results for batch {batch_id}: {message}"
            )))]
        }
    }
}

fn past_tense(action: Action) -> &'static str {
    match action {
        Action::Pause => "Paused",
        Action::Resume => "Resumed",
        Action::Stop => "Stopped",
        Action::Retry => "Retrying",
        Action::Delete => "Deleted",
    }
}
