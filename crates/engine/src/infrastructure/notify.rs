//! Notification sink adapters.

use std::sync::Mutex;

use super::ports::NotificationSink;

/// Logs notifications through `tracing` at info level.
#[derive(Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "grimward::notify", "{message}");
    }
}

/// Captures notifications for assertions in tests.
#[derive(Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for CollectingNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_notifier_captures_in_order() {
        let sink = CollectingNotifier::new();
        sink.notify("first");
        sink.notify("second");
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }
}
