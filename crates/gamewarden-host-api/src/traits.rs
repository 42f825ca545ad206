//! Host adapter traits

use std::time::Duration;
use thiserror::Error;

use crate::ProcessSnapshot;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("No such process: {0}")]
    NoSuchProcess(u32),

    #[error("Permission denied for process {0}")]
    PermissionDenied(u32),

    #[error("Process {pid} still running after {timeout:?}")]
    Timeout { pid: u32, timeout: Duration },

    #[error("Process enumeration failed: {0}")]
    Enumeration(String),

    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Stop mode for process termination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Ask the process to exit, then wait up to `timeout`
    Graceful { timeout: Duration },
    /// Kill unconditionally, then wait up to `timeout`
    Force { timeout: Duration },
}

impl StopMode {
    pub fn timeout(&self) -> Duration {
        match self {
            StopMode::Graceful { timeout } | StopMode::Force { timeout } => *timeout,
        }
    }
}

/// Host adapter trait - implemented by platform-specific adapters
pub trait HostAdapter: Send + Sync {
    /// Snapshot the live process table
    fn snapshot(&self) -> HostResult<ProcessSnapshot>;

    /// Stop a process and wait for it to exit.
    ///
    /// Returns `Ok(())` once the process is observed gone,
    /// `HostError::Timeout` if it outlives the wait, and
    /// `HostError::NoSuchProcess` if it was already gone.
    fn stop(&self, pid: u32, mode: StopMode) -> HostResult<()>;

    /// OS-level forced kill of a process and its descendants.
    /// Last resort after `stop` has failed.
    fn kill_tree(&self, pid: u32) -> HostResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_mode_timeout() {
        let graceful = StopMode::Graceful {
            timeout: Duration::from_secs(8),
        };
        let force = StopMode::Force {
            timeout: Duration::from_secs(5),
        };
        assert_eq!(graceful.timeout(), Duration::from_secs(8));
        assert_eq!(force.timeout(), Duration::from_secs(5));
    }
}
