//! Mock clocks and authorities for testing

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::{LocalClock, SyncError, SyncResult, TimeAuthority};

/// Local clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.now.lock().unwrap() = t;
    }

    pub fn advance(&self, d: Duration) {
        *self.now.lock().unwrap() += d;
    }
}

impl LocalClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Authority reporting a fixed skew from a local clock, or failing on demand
pub struct MockAuthority {
    clock: Arc<dyn LocalClock>,

    /// Authority time minus local time
    pub skew: Arc<Mutex<Duration>>,

    /// Configure queries to fail
    pub fail: Arc<Mutex<bool>>,

    queries: AtomicU32,
}

impl MockAuthority {
    /// Authority agreeing with `clock` exactly
    pub fn new(clock: Arc<dyn LocalClock>) -> Self {
        Self {
            clock,
            skew: Arc::new(Mutex::new(Duration::zero())),
            fail: Arc::new(Mutex::new(false)),
            queries: AtomicU32::new(0),
        }
    }

    pub fn with_skew(self, skew: Duration) -> Self {
        *self.skew.lock().unwrap() = skew;
        self
    }

    /// Authority that is never reachable
    pub fn unreachable(clock: Arc<dyn LocalClock>) -> Self {
        let authority = Self::new(clock);
        *authority.fail.lock().unwrap() = true;
        authority
    }

    pub fn set_skew(&self, skew: Duration) {
        *self.skew.lock().unwrap() = skew;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Number of queries made so far
    pub fn query_count(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeAuthority for MockAuthority {
    async fn query(&self) -> SyncResult<DateTime<Utc>> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if *self.fail.lock().unwrap() {
            return Err(SyncError::Io(std::io::Error::new(
                std::io::ErrorKind::NetworkUnreachable,
                "mock authority unreachable",
            )));
        }

        let skew = *self.skew.lock().unwrap();
        Ok(self.clock.now() + skew)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
