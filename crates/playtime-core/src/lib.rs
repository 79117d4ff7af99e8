//! Session tracker for playtime
//!
//! This crate is the heart of playtime, containing:
//! - Session state machine (Idle -> Active -> Idle)
//! - Daily usage accounting against the applicable limit
//! - Diagnostics for clock anomalies, failed resyncs and damaged log rows

mod error;
mod events;
mod session;
mod tracker;
mod usage;

pub use error::*;
pub use events::*;
pub use session::*;
pub use tracker::*;
pub use usage::*;
