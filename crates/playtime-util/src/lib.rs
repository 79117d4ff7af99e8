//! Shared utilities for playtime
//!
//! This crate provides:
//! - Session IDs for log correlation
//! - Time utilities (local/mock clock, day-of-week mask, log formats)
//! - Default paths for the config file and session log

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
