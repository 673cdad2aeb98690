//! User-visible notifications.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Delivers warnings to the user.
///
/// Delivery is fire-and-forget: a notifier cannot report failure back to the
/// session.
pub trait Notifier: Send + Sync {
    /// Shows `message` to the user as a warning.
    fn warn(&self, message: &str);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn warn(&self, message: &str) {
        (**self).warn(message);
    }
}

/// Notifier that writes warnings to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, message: &str) {
        warn!(target: "chatlog::user", "{message}");
    }
}

/// Notifier that keeps every message, for tests and headless hosts.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message received so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Number of messages received.
    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }
}

impl Notifier for RecordingNotifier {
    fn warn(&self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }
}
