//! Plain-text rendering of lists and sync results.

use chrono::{DateTime, Local, Utc};
use listcache_core::models::{ItemStatus, ShoppingList};
use listcache_core::offline::CachedSnapshot;
use listcache_core::{DrainOutcome, ReadOutcome, SkipReason, WriteOutcome};

/// Width of the title column in the list overview
const TITLE_WIDTH: usize = 32;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp string to a more readable local format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        dt.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string()
    } else if date.len() >= 10 {
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}

fn age_since(at: DateTime<Utc>) -> String {
    CachedSnapshot {
        records: Vec::new(),
        last_sync: at,
    }
    .age_display()
}

/// "live" or "cached, 5m ago"
pub fn source_label<T>(outcome: &ReadOutcome<T>) -> String {
    match outcome {
        ReadOutcome::Live(_) => "live".to_string(),
        ReadOutcome::Cached { cached_at, .. } => format!("cached, {}", age_since(*cached_at)),
    }
}

fn status_marker(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "[ ]",
        ItemStatus::Collected => "[x]",
        ItemStatus::Unavailable => "[-]",
    }
}

pub fn render_lists(lists: &[ShoppingList]) -> String {
    if lists.is_empty() {
        return "No lists.".to_string();
    }
    lists
        .iter()
        .map(|list| {
            let summary = list.summary();
            format!(
                "{:<12} {:<width$} {:<10} {}/{} collected",
                list.id,
                truncate_string(&list.title, TITLE_WIDTH),
                list.status,
                summary.collected,
                summary.total(),
                width = TITLE_WIDTH,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_list(list: &ShoppingList) -> String {
    let summary = list.summary();
    let mut lines = vec![
        format!("{} ({})", list.title, list.id),
        format!(
            "Status: {}  pending {}  collected {}  unavailable {}",
            list.status, summary.pending, summary.collected, summary.unavailable
        ),
    ];
    if let Some(ref at) = list.completed_at {
        let by = list.completed_by.as_deref().unwrap_or("unknown");
        lines.push(format!("Completed {} by {}", format_date(at), by));
    }
    lines.push(String::new());
    for item in &list.items {
        let qty = item.qty.map(|q| format!(" x{}", q)).unwrap_or_default();
        lines.push(format!(
            "{} {:<8} {}{}",
            status_marker(item.status),
            item.id,
            item.name,
            qty
        ));
    }
    lines.join("\n")
}

pub fn render_write(action: &str, outcome: &WriteOutcome) -> String {
    match outcome {
        WriteOutcome::Applied(_) => format!("{}: done.", action),
        WriteOutcome::Queued { id } => format!(
            "{}: backend unreachable, queued for sync ({}).",
            action,
            id.simple()
        ),
    }
}

pub fn render_drain(outcome: &DrainOutcome) -> String {
    match outcome {
        DrainOutcome::Skipped(SkipReason::Offline) => "Offline - nothing synced.".to_string(),
        DrainOutcome::Skipped(SkipReason::AlreadyRunning) => "A sync is already running.".to_string(),
        DrainOutcome::Completed(report) if report.replayed + report.retained + report.discarded == 0 => {
            "Nothing to sync.".to_string()
        }
        DrainOutcome::Completed(report) => format!(
            "Synced {}, still pending {}, discarded {}.",
            report.replayed, report.retained, report.discarded
        ),
    }
}
