//! Events emitted by the tracker

use chrono::{Duration, NaiveDateTime};
use playtime_store::{SessionRecord, SkipReason};
use playtime_util::SessionId;

/// Events emitted by the session tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// Session started
    SessionStarted {
        session_id: SessionId,
        activity: String,
        started_at: NaiveDateTime,
    },

    /// The time authority answered and a new offset is in effect
    TimeResynced { offset: Duration },

    /// The time authority could not be reached; the previous offset is kept
    TimeSyncFailed { reason: String, retained: Duration },

    /// Today's usage reached the limit. Emitted once per session.
    LimitReached {
        session_id: SessionId,
        used_minutes: u64,
        limit_minutes: u32,
    },

    /// The corrected clock went backwards during a session
    ClockAnomaly {
        session_id: SessionId,
        started_at: NaiveDateTime,
        observed: NaiveDateTime,
    },

    /// A session log row was left out of the totals
    RecordSkipped { line: u64, reason: SkipReason },

    /// Session stopped and its record persisted
    SessionStopped {
        session_id: SessionId,
        record: SessionRecord,
    },
}
