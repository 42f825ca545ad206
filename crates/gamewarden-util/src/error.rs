//! Error types shared across gamewarden crates

use thiserror::Error;

/// Errors from parsing a human-written duration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("Invalid duration format '{0}' (expected e.g. 2h, 90m, 45s, 10min)")]
    InvalidDurationFormat(String),
}

impl DurationError {
    pub fn invalid(input: impl Into<String>) -> Self {
        Self::InvalidDurationFormat(input.into())
    }
}
