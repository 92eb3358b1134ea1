use tracker_core::{AppViewModel, BatchProgressView, ItemRowView};

const BAR_WIDTH: usize = 24;

/// Renders the view model as terminal lines.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    let header = match &view.last_submit_stats {
        Some(stats) => format!(
            "Items: {} | Last submit: enqueued {}, skipped {}",
            view.item_count, stats.enqueued, stats.skipped
        ),
        None => format!("Items: {}", view.item_count),
    };
    lines.push(header);
    if view.snapshot_stale {
        lines.push("Status updates unavailable; showing last known state".to_string());
    }

    for batch in &view.batches {
        lines.push(format_batch(batch));
    }

    if view.items.is_empty() {
        lines.push("No tracked items".to_string());
    }
    for item in &view.items {
        lines.push(format_item_row(item));
    }

    lines
}

fn format_batch(batch: &BatchProgressView) -> String {
    let mut line = format!(
        "Batch {id} {bar} {percent:>3}% | done {done}/{total}, failed {failed}, pending {pending}, active {active}",
        id = batch.batch_id,
        bar = progress_bar(batch.completed, batch.total),
        percent = batch.percent,
        done = batch.completed,
        total = batch.total,
        failed = batch.failed,
        pending = batch.pending,
        active = batch.active,
    );
    if let Some(results) = &batch.results {
        line.push_str(&format!(
            " | results: {}/{} pages ok, {} records",
            results.succeeded,
            results.pages,
            format_with_commas(results.records as u64)
        ));
    }
    line
}

fn format_item_row(item: &ItemRowView) -> String {
    let mut line = format!("[{id}] {badge:<11} {url}", id = item.id, badge = item.badge, url = item.url);
    if let Some(ended) = item.ended_at {
        let elapsed = ended.signed_duration_since(item.started_at);
        line.push_str(&format!(" ({}s)", elapsed.num_seconds().max(0)));
    }
    if item.has_results {
        line.push_str(" [results]");
    }
    if let Some(pending) = item.pending_action {
        line.push_str(&format!(" <{pending} pending>"));
    }
    if !item.available_actions.is_empty() {
        let actions: Vec<&str> = item.available_actions.iter().map(|a| a.as_str()).collect();
        line.push_str(&format!(" actions: {}", actions.join(", ")));
    }
    line
}

fn progress_bar(done: u32, total: u32) -> String {
    let filled = if total == 0 {
        0
    } else {
        (u64::from(done.min(total)) * BAR_WIDTH as u64 / u64::from(total)) as usize
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tracker_core::{
        Action, AppViewModel, BatchProgressView, ItemRowView, ItemStatus, LastSubmitStats,
        ResultsSummaryView,
    };

    use super::{format_with_commas, progress_bar, render};

    fn row(status: ItemStatus) -> ItemRowView {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        ItemRowView {
            id: "w1".to_string(),
            url: "http://a.com".to_string(),
            batch_id: Some("b1".to_string()),
            status,
            badge: tracker_core::badge(status),
            available_actions: Action::available_for(status),
            pending_action: None,
            has_results: false,
            started_at: start,
            ended_at: None,
        }
    }

    #[test]
    fn commas_group_thousands() {
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(1234), "1,234");
        assert_eq!(format_with_commas(1234567), "1,234,567");
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0, 0), format!("[{}]", "-".repeat(24)));
        assert_eq!(progress_bar(1, 2), format!("[{}{}]", "#".repeat(12), "-".repeat(12)));
        assert_eq!(progress_bar(9, 4), format!("[{}]", "#".repeat(24)));
    }

    #[test]
    fn empty_view_says_so() {
        assert_eq!(
            render(&AppViewModel::default()),
            vec!["Items: 0".to_string(), "No tracked items".to_string()]
        );
    }

    #[test]
    fn rows_show_badge_and_actions() {
        let view = AppViewModel {
            items: vec![row(ItemStatus::Paused)],
            item_count: 1,
            last_submit_stats: Some(LastSubmitStats {
                enqueued: 1,
                skipped: 2,
            }),
            ..AppViewModel::default()
        };
        let lines = render(&view);
        assert_eq!(lines[0], "Items: 1 | Last submit: enqueued 1, skipped 2");
        assert_eq!(lines[1], "[w1] Paused      http://a.com actions: resume, delete");
    }

    #[test]
    fn completed_row_shows_elapsed_time() {
        let mut done = row(ItemStatus::Completed);
        done.ended_at = Some(done.started_at + Duration::seconds(42));
        let view = AppViewModel {
            items: vec![done],
            item_count: 1,
            ..AppViewModel::default()
        };
        assert!(render(&view)[1].contains("(42s)"));
    }

    #[test]
    fn rows_mark_available_results() {
        let mut done = row(ItemStatus::Completed);
        done.has_results = true;
        let view = AppViewModel {
            items: vec![done, row(ItemStatus::Scraping)],
            item_count: 2,
            ..AppViewModel::default()
        };
        let lines = render(&view);
        assert_eq!(lines[1], "[w1] Done        http://a.com [results] actions: delete");
        assert!(!lines[2].contains("[results]"));
    }

    #[test]
    fn batch_line_includes_results_summary() {
        let view = AppViewModel {
            batches: vec![BatchProgressView {
                batch_id: "b1".to_string(),
                total: 4,
                completed: 2,
                failed: 1,
                pending: 1,
                active: 0,
                percent: 50,
                results: Some(ResultsSummaryView {
                    pages: 3,
                    succeeded: 2,
                    records: 1500,
                }),
            }],
            snapshot_stale: true,
            ..AppViewModel::default()
        };
        let lines = render(&view);
        assert_eq!(lines[1], "Status updates unavailable; showing last known state");
        assert!(lines[2].starts_with("Batch b1 [############------------]  50%"));
        assert!(lines[2].ends_with("results: 2/3 pages ok, 1,500 records"));
    }
}
