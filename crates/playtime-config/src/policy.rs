//! Validated policy structures

use crate::schema::RawConfig;
use crate::validation::{parse_date, MAX_SYNC_TIMEOUT_SECS};
use chrono::{Datelike, NaiveDate};
use playtime_util::DaysOfWeek;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_WEEKDAY_LIMIT_MINUTES: u32 = 60;
pub const DEFAULT_WEEKEND_LIMIT_MINUTES: u32 = 180;
pub const DEFAULT_TIME_SERVER: &str = "pool.ntp.org:123";
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(3);

const MAX_LIMIT_MINUTES: u32 = 24 * 60;

/// Which kind of day a date is, for choosing its budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Weekday,
    Weekend,
    Holiday,
}

impl fmt::Display for DayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayKind::Weekday => write!(f, "Weekday"),
            DayKind::Weekend => write!(f, "Weekend"),
            DayKind::Holiday => write!(f, "Holiday"),
        }
    }
}

/// Validated policy ready for use by the tracker
#[derive(Debug, Clone)]
pub struct Policy {
    /// Daily budget Monday through Friday
    pub weekday_limit_minutes: u32,

    /// Daily budget on weekends and holidays
    pub weekend_limit_minutes: u32,

    /// Dates that get the weekend budget whatever day they fall on
    pub holidays: BTreeSet<NaiveDate>,

    /// Activity labels, in the order they are offered
    pub activities: Vec<String>,

    /// Network time settings
    pub time_sync: TimeSyncConfig,

    /// Session log override
    pub ledger_path: Option<PathBuf>,
}

impl Policy {
    /// Convert from raw config.
    ///
    /// Lenient: a field that fails validation falls back to its default (or
    /// is dropped, for individual holidays and labels) with a warning, so a
    /// single typo never costs the rest of the file.
    pub fn from_raw(raw: RawConfig) -> Self {
        let weekday_limit_minutes = convert_limit(
            "weekday_limit_minutes",
            raw.weekday_limit_minutes,
            DEFAULT_WEEKDAY_LIMIT_MINUTES,
        );
        let weekend_limit_minutes = convert_limit(
            "weekend_limit_minutes",
            raw.weekend_limit_minutes,
            DEFAULT_WEEKEND_LIMIT_MINUTES,
        );

        let holidays = raw
            .holidays
            .iter()
            .filter_map(|s| {
                let date = parse_date(s);
                if date.is_none() {
                    warn!(value = %s, "Ignoring invalid holiday date");
                }
                date
            })
            .collect();

        let activities = convert_activities(raw.games);

        Self {
            weekday_limit_minutes,
            weekend_limit_minutes,
            holidays,
            activities,
            time_sync: TimeSyncConfig::from_raw(raw.time_server, raw.time_sync_timeout_seconds),
            ledger_path: raw.ledger_path,
        }
    }

    /// Whether the date is listed as a holiday
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Classify a date. Holidays win over the day of the week; weekends are
    /// always Saturday and Sunday.
    pub fn day_kind(&self, date: NaiveDate) -> DayKind {
        if self.is_holiday(date) {
            DayKind::Holiday
        } else if DaysOfWeek::WEEKENDS.contains(date.weekday()) {
            DayKind::Weekend
        } else {
            DayKind::Weekday
        }
    }

    /// Daily budget in minutes for the given date
    pub fn limit_for(&self, date: NaiveDate) -> u32 {
        match self.day_kind(date) {
            DayKind::Holiday | DayKind::Weekend => self.weekend_limit_minutes,
            DayKind::Weekday => self.weekday_limit_minutes,
        }
    }

    /// Activity offered first when none is chosen
    pub fn default_activity(&self) -> &str {
        self.activities.first().map(String::as_str).unwrap_or("")
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

/// Network time settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSyncConfig {
    /// SNTP server, `host:port`
    pub server: String,
    /// Bound on one resync attempt
    pub timeout: Duration,
}

impl TimeSyncConfig {
    fn from_raw(server: Option<String>, timeout_secs: Option<u64>) -> Self {
        let server = match server.map(|s| s.trim().to_string()) {
            Some(s) if s.is_empty() => {
                warn!("Empty time_server, using default");
                DEFAULT_TIME_SERVER.to_string()
            }
            Some(s) if s.contains(':') => s,
            Some(s) => format!("{}:123", s),
            None => DEFAULT_TIME_SERVER.to_string(),
        };

        let timeout = timeout_secs
            .map(|secs| {
                let clamped = secs.clamp(1, MAX_SYNC_TIMEOUT_SECS);
                if clamped != secs {
                    warn!(value = secs, clamped, "time_sync_timeout_seconds out of range");
                }
                Duration::from_secs(clamped)
            })
            .unwrap_or(DEFAULT_SYNC_TIMEOUT);

        Self { server, timeout }
    }
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self::from_raw(None, None)
    }
}

// Conversion helpers

fn convert_limit(field: &'static str, value: Option<i64>, default: u32) -> u32 {
    match value {
        None => default,
        Some(v) if v < 0 => {
            warn!(field, value = v, default, "Negative limit, using default");
            default
        }
        Some(v) if v > MAX_LIMIT_MINUTES as i64 => {
            warn!(field, value = v, "Limit longer than a day, clamping");
            MAX_LIMIT_MINUTES
        }
        Some(v) => v as u32,
    }
}

fn convert_activities(raw: Option<Vec<String>>) -> Vec<String> {
    let Some(raw) = raw else {
        return default_activities();
    };

    let mut activities: Vec<String> = Vec::with_capacity(raw.len());
    for label in raw {
        let label = label.trim().to_string();
        if label.is_empty() || activities.contains(&label) {
            continue;
        }
        activities.push(label);
    }

    if activities.is_empty() {
        warn!("No usable activity labels, using defaults");
        return default_activities();
    }
    activities
}

fn default_activities() -> Vec<String> {
    ["Minecraft", "VR", "Roblox", "Other"]
        .into_iter()
        .map(String::from)
        .collect()
}
