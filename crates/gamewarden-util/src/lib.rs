//! Shared utilities for gamewarden
//!
//! This crate provides:
//! - Duration parsing for human-written limits ("2h", "90m", "10min")
//! - Time utilities (mockable wall clock, day keys, `HH:MM:SS` formatting)
//! - Error types
//! - Default paths for config and data files

mod duration;
mod error;
mod paths;
mod time;

pub use duration::*;
pub use error::*;
pub use paths::*;
pub use time::*;
