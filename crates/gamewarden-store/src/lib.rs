//! Persistence layer for gamewarden
//!
//! Provides:
//! - The daily usage record (calendar day -> seconds played)
//! - A JSON file store with self-healing load and atomic replace on save
//! - An in-memory store for tests
//!
//! Only one monitor may use a given usage file at a time. Two daemons
//! writing the same file interleave whole-file replaces in no defined order.

mod json;
mod memory;
mod traits;
mod usage;

pub use json::*;
pub use memory::*;
pub use traits::*;
pub use usage::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
