//! Session tracker

use chrono::{NaiveDate, NaiveDateTime};
use playtime_clock::{SyncOutcome, TimeSource};
use playtime_config::Policy;
use playtime_store::{LedgerScan, SessionLedger, SessionRecord};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    ActiveSession, DailyUsage, TrackerError, TrackerEvent, TrackerResult, UsageSummary,
};

/// Result of a tick while a session is running
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Time since the session started, never negative
    pub elapsed: chrono::Duration,

    /// Usage for the day the session is charged to
    pub usage: UsageSummary,

    /// Whether the limit is used up (used >= limit)
    pub exceeded: bool,

    pub events: Vec<TrackerEvent>,
}

/// Result of stopping a session
#[derive(Debug, Clone)]
pub struct StopResult {
    /// The record as persisted
    pub record: SessionRecord,

    pub events: Vec<TrackerEvent>,
}

/// The session state machine.
///
/// Idle until [`start`](Self::start), Active until [`stop`](Self::stop).
/// Driven from a single task; nothing here is shared.
pub struct SessionTracker {
    policy: Policy,
    ledger: Arc<dyn SessionLedger>,
    time: Arc<TimeSource>,
    current: Option<ActiveSession>,
    reported_skips: HashSet<u64>,
}

impl SessionTracker {
    /// Create a tracker without touching the log
    pub fn new(policy: Policy, ledger: Arc<dyn SessionLedger>, time: Arc<TimeSource>) -> Self {
        Self {
            policy,
            ledger,
            time,
            current: None,
            reported_skips: HashSet::new(),
        }
    }

    /// Create a tracker, first making sure the log has a usable header
    pub fn open(
        policy: Policy,
        ledger: Arc<dyn SessionLedger>,
        time: Arc<TimeSource>,
    ) -> TrackerResult<Self> {
        let status = ledger.ensure_schema()?;
        info!(
            ledger = %ledger.describe(),
            status = ?status,
            weekday_limit = policy.weekday_limit_minutes,
            weekend_limit = policy.weekend_limit_minutes,
            holidays = policy.holidays.len(),
            "Session tracker initialized"
        );
        Ok(Self::new(policy, ledger, time))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn time_source(&self) -> &TimeSource {
        &self.time
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.current.as_ref()
    }

    fn now(&self) -> NaiveDateTime {
        self.time.now().naive_local()
    }

    /// Resync with the time authority and start a session
    pub async fn start(&mut self, activity: impl Into<String>) -> TrackerResult<Vec<TrackerEvent>> {
        if let Some(active) = &self.current {
            debug!(session_id = %active.session_id, "Start rejected, session already running");
            return Err(TrackerError::AlreadyActive {
                since: active.started_at,
            });
        }

        let mut events = Vec::new();
        events.push(self.resync().await);

        let session = ActiveSession::new(self.now(), activity);
        info!(
            session_id = %session.session_id,
            activity = %session.activity,
            started_at = %session.started_at,
            "Session started"
        );

        events.push(TrackerEvent::SessionStarted {
            session_id: session.session_id.clone(),
            activity: session.activity.clone(),
            started_at: session.started_at,
        });
        self.current = Some(session);

        Ok(events)
    }

    /// Resync with the time authority outside a session start
    pub async fn resync(&self) -> TrackerEvent {
        match self.time.resync().await {
            SyncOutcome::Resynced { offset } => TrackerEvent::TimeResynced { offset },
            SyncOutcome::Failed { reason, retained } => {
                TrackerEvent::TimeSyncFailed { reason, retained }
            }
        }
    }

    /// Measure the running session against the limit of its day
    pub fn tick(&mut self) -> TrackerResult<TickReport> {
        let now = self.now();
        let session = self.current.as_ref().ok_or(TrackerError::NotActive)?;
        let date = session.date();
        let elapsed = session.elapsed(now);

        let scan = self.ledger.read_all()?;
        let mut events = self.new_skips(&scan);

        let usage = DailyUsage {
            date,
            committed_minutes: scan.minutes_on(date),
            live: elapsed,
            session_active: true,
        };
        let limit = self.policy.limit_for(date);
        let exceeded = usage.exceeds(limit);
        let summary = UsageSummary::new(&usage, self.policy.day_kind(date), limit);

        if let Some(session) = self.current.as_mut()
            && exceeded
            && !session.limit_notified
        {
            session.limit_notified = true;
            info!(
                session_id = %session.session_id,
                used_minutes = summary.used_minutes,
                limit_minutes = limit,
                "Daily limit reached"
            );
            events.push(TrackerEvent::LimitReached {
                session_id: session.session_id.clone(),
                used_minutes: summary.used_minutes,
                limit_minutes: limit,
            });
        }

        Ok(TickReport {
            elapsed,
            usage: summary,
            exceeded,
            events,
        })
    }

    /// Stop the running session and persist it.
    ///
    /// If the record cannot be written the session keeps running, so the
    /// caller can retry.
    pub fn stop(&mut self) -> TrackerResult<StopResult> {
        let session = self.current.take().ok_or(TrackerError::NotActive)?;
        let now = self.now();
        let mut events = Vec::new();

        if now < session.started_at {
            warn!(
                session_id = %session.session_id,
                started_at = %session.started_at,
                observed = %now,
                "Clock went backwards during session, recording zero duration"
            );
            events.push(TrackerEvent::ClockAnomaly {
                session_id: session.session_id.clone(),
                started_at: session.started_at,
                observed: now,
            });
        }

        let record = SessionRecord::new(session.started_at, now, session.activity.clone());
        if let Err(e) = self.ledger.append(&record) {
            warn!(
                session_id = %session.session_id,
                error = %e,
                "Failed to persist session, keeping it active"
            );
            self.current = Some(session);
            return Err(e.into());
        }

        info!(
            session_id = %session.session_id,
            activity = %record.activity,
            duration_minutes = record.duration_minutes,
            "Session stopped"
        );
        events.push(TrackerEvent::SessionStopped {
            session_id: session.session_id,
            record: record.clone(),
        });

        Ok(StopResult { record, events })
    }

    /// Usage on a date, including the running session if it is charged there
    pub fn daily_usage(&self, date: NaiveDate) -> TrackerResult<DailyUsage> {
        let scan = self.ledger.read_all()?;
        let active = self.current.as_ref().filter(|s| s.date() == date);

        Ok(DailyUsage {
            date,
            committed_minutes: scan.minutes_on(date),
            live: active
                .map(|s| s.elapsed(self.now()))
                .unwrap_or_else(chrono::Duration::zero),
            session_active: active.is_some(),
        })
    }

    /// Summary for the day usage is currently charged to: the running
    /// session's day, or today when idle
    pub fn summary(&self) -> TrackerResult<UsageSummary> {
        let date = self
            .current
            .as_ref()
            .map(ActiveSession::date)
            .unwrap_or_else(|| self.now().date());
        let usage = self.daily_usage(date)?;
        Ok(UsageSummary::new(
            &usage,
            self.policy.day_kind(date),
            self.policy.limit_for(date),
        ))
    }

    /// Most recent records, newest first
    pub fn recent_sessions(&self, limit: usize) -> TrackerResult<Vec<SessionRecord>> {
        Ok(self.ledger.recent(limit)?)
    }

    fn new_skips(&mut self, scan: &LedgerScan) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        for skipped in &scan.skipped {
            if self.reported_skips.insert(skipped.line) {
                warn!(line = skipped.line, reason = %skipped.reason, "Skipping session log row");
                events.push(TrackerEvent::RecordSkipped {
                    line: skipped.line,
                    reason: skipped.reason.clone(),
                });
            }
        }
        events
    }
}
