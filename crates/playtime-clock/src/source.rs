//! Corrected time source
//!
//! Keeps the difference between a time authority and the local clock, and
//! applies it to every reading of the local clock. Changing the local clock
//! after a resync moves the corrected time by the same amount, so it only
//! helps until the next session starts.

use chrono::{DateTime, Duration, Local, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::{LocalClock, SystemClock, TimeAuthority};

/// Result of one resync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The authority answered; `offset` is now in effect
    Resynced { offset: Duration },
    /// The authority could not be reached; `retained` is still in effect
    Failed { reason: String, retained: Duration },
}

impl SyncOutcome {
    pub fn is_resynced(&self) -> bool {
        matches!(self, SyncOutcome::Resynced { .. })
    }
}

/// Local clock plus the last known correction from a time authority
pub struct TimeSource {
    clock: Arc<dyn LocalClock>,
    authority: Arc<dyn TimeAuthority>,
    offset_ms: AtomicI64,
    last_synced: Mutex<Option<DateTime<Utc>>>,
}

impl TimeSource {
    /// Starts with a zero offset; nothing is queried until [`Self::resync`]
    pub fn new(clock: Arc<dyn LocalClock>, authority: Arc<dyn TimeAuthority>) -> Self {
        Self {
            clock,
            authority,
            offset_ms: AtomicI64::new(0),
            last_synced: Mutex::new(None),
        }
    }

    /// System clock corrected against the given authority
    pub fn system(authority: Arc<dyn TimeAuthority>) -> Self {
        Self::new(Arc::new(SystemClock), authority)
    }

    /// Query the authority and replace the offset on success.
    ///
    /// Never fails; on error the previous offset stays in effect.
    pub async fn resync(&self) -> SyncOutcome {
        match self.authority.query().await {
            Ok(authoritative) => {
                let local = self.clock.now();
                let offset = authoritative - local;
                self.offset_ms
                    .store(offset.num_milliseconds(), Ordering::SeqCst);
                *self
                    .last_synced
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(authoritative);

                info!(
                    authority = self.authority.name(),
                    offset_ms = offset.num_milliseconds(),
                    "Time resynced"
                );
                SyncOutcome::Resynced {
                    offset: Duration::milliseconds(offset.num_milliseconds()),
                }
            }
            Err(e) => {
                let retained = self.offset();
                warn!(
                    authority = self.authority.name(),
                    error = %e,
                    retained_offset_ms = retained.num_milliseconds(),
                    "Time resync failed, keeping previous offset"
                );
                SyncOutcome::Failed {
                    reason: e.to_string(),
                    retained,
                }
            }
        }
    }

    /// Offset currently applied to the local clock
    pub fn offset(&self) -> Duration {
        Duration::milliseconds(self.offset_ms.load(Ordering::SeqCst))
    }

    /// Corrected current time
    pub fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now() + self.offset()
    }

    /// Corrected current local time
    pub fn now(&self) -> DateTime<Local> {
        self.now_utc().with_timezone(&Local)
    }

    /// Authority time at the last successful resync
    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        *self.last_synced.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn authority_name(&self) -> &str {
        self.authority.name()
    }
}
