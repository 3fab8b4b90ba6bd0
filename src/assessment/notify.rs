//! User-visible failure notifications.

use std::sync::Mutex;

/// Something that can show the user a one-line message.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Buffers notifications until a front end drains them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered notifications, oldest first.
    pub fn drain(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(notification = message, "User notification queued");
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}
