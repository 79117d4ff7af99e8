//! Persistence layer for playtime
//!
//! Provides:
//! - The session record and its log row format
//! - An append-only CSV session log with header repair
//! - Tolerant reads that skip and report malformed rows

mod csv_ledger;
mod record;
mod traits;

pub use csv_ledger::*;
pub use record::{round_to_minutes, LedgerScan, SessionRecord, SkipReason, SkippedRow, LEDGER_HEADER};
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Session log header {found:?} does not match expected {expected:?}")]
    SchemaMismatch {
        found: Vec<String>,
        expected: Vec<String>,
    },
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        let message = e.to_string();
        match e.into_kind() {
            csv::ErrorKind::Io(io) => StoreError::Io(io),
            _ => StoreError::Csv(message),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
