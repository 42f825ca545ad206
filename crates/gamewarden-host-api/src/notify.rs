//! Notification sink interface

use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors delivering a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification backend unavailable: {0}")]
    Unavailable(String),

    #[error("Notification failed: {0}")]
    Failed(String),
}

/// Fire-and-forget delivery of a short human-readable message
pub trait NotificationSink: Send {
    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Sink that drops every message (notifications disabled)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn send(&self, _title: &str, _body: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Sink that records messages, optionally failing, for tests
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    attempts: Arc<Mutex<usize>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every send fails
    pub fn failing() -> Self {
        let sink = Self::default();
        *sink.fail.lock().unwrap() = true;
        sink
    }

    /// Delivered (title, body) pairs
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of send calls, successful or not
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        *self.attempts.lock().unwrap() += 1;
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Failed("Mock notification failure".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
