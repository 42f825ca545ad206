//! Host adapter trait interfaces for gamewarden
//!
//! This crate defines the interface between the monitor core and the
//! platform: the process table, process control and notification delivery.
//! It contains no platform code itself.

mod mock;
mod notify;
mod process;
mod traits;

pub use mock::*;
pub use notify::*;
pub use process::*;
pub use traits::*;
