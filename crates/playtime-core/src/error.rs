//! Tracker errors

use chrono::NaiveDateTime;
use playtime_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("A session is already running (started {since})")]
    AlreadyActive { since: NaiveDateTime },

    #[error("No session is running")]
    NotActive,

    #[error("Session log error: {0}")]
    Store(#[from] StoreError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
