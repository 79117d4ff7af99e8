//! Text rendering of tracker state

use chrono::Duration;
use playtime_core::{UsageLevel, UsageSummary};
use playtime_store::SessionRecord;
use playtime_util::{format_stopwatch, DATE_FORMAT};

const BAR_WIDTH: usize = 20;

/// `[#####---------------]`
pub fn progress_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) * BAR_WIDTH) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn level_label(level: UsageLevel) -> &'static str {
    match level {
        UsageLevel::Normal => "ok",
        UsageLevel::Warning => "almost out",
        UsageLevel::Exceeded => "limit reached",
    }
}

/// Multi-line summary for `playtime status`
pub fn summary_block(summary: &UsageSummary) -> String {
    format!(
        "{} ({})\n  Used:      {} of {} min\n  Remaining: {} min\n  {} {}%  {}",
        summary.date.format(DATE_FORMAT),
        summary.day_kind,
        summary.used_minutes,
        summary.limit_minutes,
        summary.remaining_minutes,
        progress_bar(summary.percent),
        summary.percent,
        level_label(summary.level),
    )
}

/// Single status line redrawn while a session runs
pub fn session_line(activity: &str, elapsed: Duration, summary: &UsageSummary) -> String {
    let elapsed = elapsed.to_std().unwrap_or_default();
    let label = if activity.is_empty() { "Playing" } else { activity };
    format!(
        "{}  {}  {} {}/{} min  {}",
        label,
        format_stopwatch(elapsed),
        progress_bar(summary.percent),
        summary.used_minutes,
        summary.limit_minutes,
        level_label(summary.level),
    )
}

/// One row of `playtime history`
pub fn history_row(record: &SessionRecord) -> String {
    let activity = if record.activity.is_empty() {
        "-"
    } else {
        record.activity.as_str()
    };
    format!(
        "{}  {} - {}  {:>4} min  {}",
        record.date.format(DATE_FORMAT),
        record.start_time.format("%H:%M"),
        record.end_time.format("%H:%M"),
        record.duration_minutes,
        activity,
    )
}
