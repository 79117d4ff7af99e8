//! The running session

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use playtime_util::SessionId;

/// A session between start and stop. Never persisted.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session_id: SessionId,

    /// Corrected local start time, whole seconds
    pub started_at: NaiveDateTime,

    pub activity: String,

    /// Whether `LimitReached` was already emitted for this session
    pub limit_notified: bool,
}

impl ActiveSession {
    pub fn new(started_at: NaiveDateTime, activity: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::new(),
            started_at: started_at.with_nanosecond(0).unwrap_or(started_at),
            activity: activity.into(),
            limit_notified: false,
        }
    }

    /// The day this session is charged against
    pub fn date(&self) -> NaiveDate {
        self.started_at.date()
    }

    /// Time since start, never negative
    pub fn elapsed(&self, now: NaiveDateTime) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }
}
