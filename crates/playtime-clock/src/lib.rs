//! Trustworthy time for playtime
//!
//! This crate defines the seam between the tracker and the outside notion of
//! time: a local clock that may be wrong, an authority that may be absent,
//! and a time source combining the two.

mod mock;
pub mod packet;
mod sntp;
mod source;
mod traits;

pub use mock::*;
pub use sntp::*;
pub use source::*;
pub use traits::*;
