//! Session record types and row validation

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use csv::StringRecord;
use playtime_util::{format_timestamp, DATE_FORMAT, TIMESTAMP_FORMAT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Column layout of the session log, in order
pub const LEDGER_HEADER: [&str; 5] = ["date", "start_time", "end_time", "duration_minutes", "game"];

/// Time-only formats accepted for rows written before timestamps carried a date
const LEGACY_TIME_FORMATS: [&str; 3] = ["%I:%M %p", "%H:%M:%S", "%H:%M"];

/// One completed play session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Day the session started on; the day it counts against
    pub date: NaiveDate,

    /// Corrected local start time, whole seconds
    pub start_time: NaiveDateTime,

    /// Corrected local end time, whole seconds, never before `start_time`
    pub end_time: NaiveDateTime,

    /// Always derived from the two timestamps
    pub duration_minutes: u64,

    /// Activity label, possibly empty
    pub activity: String,
}

impl SessionRecord {
    /// Build a record from its timestamps.
    ///
    /// Sub-second precision is dropped so the record survives a round trip
    /// through the log unchanged. An end before the start is clamped to the
    /// start, giving a zero-length session.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, activity: impl Into<String>) -> Self {
        let start_time = truncate_to_second(start);
        let end_time = truncate_to_second(end).max(start_time);

        Self {
            date: start_time.date(),
            start_time,
            end_time,
            duration_minutes: round_to_minutes(end_time - start_time),
            activity: activity.into(),
        }
    }

    /// Exact length of the session
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Fields in log column order
    pub fn to_row(&self) -> [String; 5] {
        [
            self.date.format(DATE_FORMAT).to_string(),
            format_timestamp(&self.start_time),
            format_timestamp(&self.end_time),
            self.duration_minutes.to_string(),
            self.activity.clone(),
        ]
    }
}

/// Round a duration to the nearest whole minute, treating negatives as zero
pub fn round_to_minutes(d: Duration) -> u64 {
    let secs = d.num_seconds().max(0) as u64;
    (secs + 30) / 60
}

fn truncate_to_second(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Why a log row was left out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("expected {expected} columns, found {found}")]
    WrongColumnCount { expected: usize, found: usize },

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid {column} '{value}'")]
    InvalidTimestamp { column: &'static str, value: String },

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("end time {end} is before start time {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("unreadable row: {0}")]
    Unreadable(String),
}

/// A row that was skipped while reading the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the log file
    pub line: u64,
    pub reason: SkipReason,
}

/// Result of reading the whole log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerScan {
    /// Well-formed records in file order
    pub records: Vec<SessionRecord>,
    /// Rows that were left out
    pub skipped: Vec<SkippedRow>,
}

impl LedgerScan {
    /// Total committed minutes attributed to a date
    pub fn minutes_on(&self, date: NaiveDate) -> u64 {
        self.records
            .iter()
            .filter(|r| r.date == date)
            .map(|r| r.duration_minutes)
            .sum()
    }
}

/// Whether a row is the log header (tolerating a UTF-8 byte order mark)
pub(crate) fn is_header(row: &StringRecord) -> bool {
    row.len() == LEDGER_HEADER.len()
        && row
            .iter()
            .zip(LEDGER_HEADER)
            .all(|(field, expected)| field.trim_start_matches('\u{feff}').trim() == expected)
}

/// Whether a header row names an expected column at the wrong position
pub(crate) fn has_displaced_columns(row: &StringRecord) -> bool {
    row.iter().enumerate().any(|(i, field)| {
        let name = field.trim_start_matches('\u{feff}').trim();
        LEDGER_HEADER
            .iter()
            .position(|expected| expected.eq_ignore_ascii_case(name))
            .is_some_and(|pos| pos != i)
    })
}

/// Whether a row looks like session data rather than a header
pub(crate) fn looks_like_data(row: &StringRecord) -> bool {
    row.get(0)
        .map(|field| NaiveDate::parse_from_str(field.trim(), DATE_FORMAT).is_ok())
        .unwrap_or(false)
}

/// Validate and parse one data row.
///
/// The stored duration must be a non-negative number but is otherwise only
/// checked against the timestamps; the record always carries the derived
/// value.
pub(crate) fn parse_row(row: &StringRecord) -> Result<SessionRecord, SkipReason> {
    if row.len() != LEDGER_HEADER.len() {
        return Err(SkipReason::WrongColumnCount {
            expected: LEDGER_HEADER.len(),
            found: row.len(),
        });
    }

    let field = |i: usize| row.get(i).unwrap_or("").trim();

    let date = NaiveDate::parse_from_str(field(0), DATE_FORMAT)
        .map_err(|_| SkipReason::InvalidDate(field(0).to_string()))?;

    let (start, _) = parse_timestamp("start_time", field(1), date)?;
    let (mut end, end_is_legacy) = parse_timestamp("end_time", field(2), date)?;

    // Legacy rows only carry a time of day; an earlier end wrapped past midnight
    if end_is_legacy && end < start {
        end += Duration::days(1);
    }

    let stored = field(3);
    let stored_minutes: f64 = stored
        .parse()
        .map_err(|_| SkipReason::InvalidDuration(stored.to_string()))?;
    if !stored_minutes.is_finite() || stored_minutes < 0.0 {
        return Err(SkipReason::InvalidDuration(stored.to_string()));
    }

    if end < start {
        return Err(SkipReason::EndBeforeStart {
            start: field(1).to_string(),
            end: field(2).to_string(),
        });
    }

    // Free text; kept exactly as written
    let activity = row.get(4).unwrap_or("");
    let record = SessionRecord::new(start, end, activity);
    if (stored_minutes - record.duration_minutes as f64).abs() >= 1.0 {
        debug!(
            stored = stored_minutes,
            derived = record.duration_minutes,
            date = %record.date,
            "Stored duration disagrees with timestamps, using timestamps"
        );
    }

    Ok(record)
}

/// Parse a full timestamp, or a bare time of day on the row's date.
/// The flag reports whether the legacy time-only form was used.
fn parse_timestamp(
    column: &'static str,
    value: &str,
    date: NaiveDate,
) -> Result<(NaiveDateTime, bool), SkipReason> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Ok((dt, false));
    }

    LEGACY_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
        .map(|time| (date.and_time(time), true))
        .ok_or_else(|| SkipReason::InvalidTimestamp {
            column,
            value: value.to_string(),
        })
}
