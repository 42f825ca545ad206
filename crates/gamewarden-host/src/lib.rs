//! Host adapter for gamewarden
//!
//! Provides:
//! - Process table snapshots via `sysinfo`
//! - Graceful (SIGTERM) and forceful (SIGKILL) termination with exit wait
//! - Forced tree kill (`taskkill /F /T` on Windows, SIGKILL per descendant elsewhere)
//! - Desktop notifications through the platform's notification tool

mod desktop;
mod system;

pub use desktop::*;
pub use system::*;
