//! Notification delivery with a failure latch

use gamewarden_host_api::{NotificationSink, NullSink};
use tracing::{debug, warn};

/// Message shown when the daily budget is used up
pub const EXHAUSTED_MESSAGE: &str = "Your game time for today is used up. Games and the launcher will be closed.";

/// Wraps a sink and stops using it after the first failure.
///
/// Delivery is best effort: a failure is logged once and every later
/// call is a silent no-op for the lifetime of this notifier.
pub struct Notifier {
    sink: Box<dyn NotificationSink>,
    title: String,
    disabled: bool,
}

impl Notifier {
    pub fn new(sink: Box<dyn NotificationSink>, title: impl Into<String>) -> Self {
        Self {
            sink,
            title: title.into(),
            disabled: false,
        }
    }

    /// A notifier that never delivers anything
    pub fn disabled() -> Self {
        Self {
            sink: Box::new(NullSink),
            title: String::new(),
            disabled: true,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Try to deliver `message`. Returns whether it was delivered.
    pub fn notify(&mut self, message: &str) -> bool {
        if self.is_disabled() {
            debug!("Notifications disabled, dropping message");
            return false;
        }

        match self.sink.send(&self.title, message) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Notification failed, disabling notifications");
                self.disabled = true;
                false
            }
        }
    }
}
