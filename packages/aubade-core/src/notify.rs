//! Outbound notifications about automation activity.

use async_trait::async_trait;

/// Sink for human-facing automation notices.
///
/// Implementations must not fail the caller; delivery problems are theirs
/// to log and swallow.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str);
}

/// Notifier that writes to the application log. The default sink when no
/// external channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) {
        log::info!("[Notify] {}", message);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// Notifier that records messages for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.lock().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) {
            self.messages.lock().push(message.to_string());
        }
    }
}
