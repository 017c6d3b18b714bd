//! Type definitions for ccwrapped

mod error;
mod period;
mod snapshot;
mod stats_cache;
mod usage;

pub use error::*;
pub use period::Period;
pub use snapshot::*;
pub use stats_cache::*;
pub use usage::*;
