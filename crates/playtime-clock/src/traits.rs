//! Time authority and local clock traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors from querying a time authority
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to resolve time server {server}: {reason}")]
    Resolve { server: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Time server did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Invalid reply from time server: {0}")]
    InvalidReply(String),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// An external source of the current UTC instant
#[async_trait]
pub trait TimeAuthority: Send + Sync {
    /// Ask the authority for the current instant.
    ///
    /// Implementations bound the query by their own timeout.
    async fn query(&self) -> SyncResult<DateTime<Utc>>;

    /// Name for logs (server address for network authorities)
    fn name(&self) -> &str;
}

/// The machine's own clock, which may be wrong or deliberately changed
pub trait LocalClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Local clock backed by the system wall clock.
///
/// Honours `PLAYTIME_MOCK_TIME` in debug builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl LocalClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        playtime_util::now().with_timezone(&Utc)
    }
}
