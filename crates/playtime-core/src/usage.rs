//! Daily usage and its presentation summary

use chrono::{Duration, NaiveDate};
use playtime_config::DayKind;
use playtime_store::round_to_minutes;
use serde::Serialize;

/// Percentage of the limit at which usage is shown as a warning
pub const WARNING_PERCENT: u64 = 80;

/// Time used on one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyUsage {
    pub date: NaiveDate,

    /// Minutes from records already in the log
    pub committed_minutes: u64,

    /// Elapsed time of the running session, if it is charged to this date
    pub live: Duration,

    /// Whether a running session is charged to this date
    pub session_active: bool,
}

impl DailyUsage {
    /// Committed plus live time
    pub fn total(&self) -> Duration {
        Duration::minutes(self.committed_minutes as i64) + self.live
    }

    /// Total in whole minutes, rounded the way a stop would record it
    pub fn total_minutes(&self) -> u64 {
        self.committed_minutes + round_to_minutes(self.live)
    }

    /// Whole minutes fully used so far; never ahead of the exact total
    pub fn elapsed_minutes(&self) -> u64 {
        self.total().num_minutes().max(0) as u64
    }

    /// Whether `limit_minutes` is used up (used >= limit)
    pub fn exceeds(&self, limit_minutes: u32) -> bool {
        self.elapsed_minutes() >= u64::from(limit_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLevel {
    Normal,
    Warning,
    Exceeded,
}

/// Everything a front-end needs to render today's budget.
///
/// Every figure comes from [`DailyUsage::elapsed_minutes`], so the level
/// agrees with the numbers shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub date: NaiveDate,
    pub day_kind: DayKind,
    pub used_minutes: u64,
    pub limit_minutes: u32,
    pub remaining_minutes: u64,
    /// Capped at 100
    pub percent: u8,
    pub level: UsageLevel,
    pub session_active: bool,
}

impl UsageSummary {
    pub fn new(usage: &DailyUsage, day_kind: DayKind, limit_minutes: u32) -> Self {
        let used_minutes = usage.elapsed_minutes();
        let limit = u64::from(limit_minutes);
        let exceeded = used_minutes >= limit;

        let percent = if limit == 0 {
            100
        } else {
            (used_minutes * 100 / limit).min(100)
        };

        let level = if exceeded {
            UsageLevel::Exceeded
        } else if percent >= WARNING_PERCENT {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        };

        Self {
            date: usage.date,
            day_kind,
            used_minutes,
            limit_minutes,
            remaining_minutes: limit.saturating_sub(used_minutes),
            percent: percent as u8,
            level,
            session_active: usage.session_active,
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.level == UsageLevel::Exceeded
    }
}
