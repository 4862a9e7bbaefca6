//! Alert dispatch with failure isolation

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::config::AlertMessage;
use super::notifier::{Notifier, NotifierError};

/// Default bound on a single notifier call
pub const DEFAULT_NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub delivered: bool,
    pub detail: Option<String>,
}

impl DispatchResult {
    fn delivered() -> Self {
        Self {
            delivered: true,
            detail: None,
        }
    }

    fn failed(error: &NotifierError) -> Self {
        Self {
            delivered: false,
            detail: Some(error.to_string()),
        }
    }
}

/// Sends alert messages through a notifier. Failures are logged and
/// reported in the result, never raised; there is no retry.
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            timeout: DEFAULT_NOTIFIER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn notifier_name(&self) -> &'static str {
        self.notifier.name()
    }

    pub async fn dispatch(&self, message: &AlertMessage) -> DispatchResult {
        let content = message.content();

        let outcome = match tokio::time::timeout(self.timeout, self.notifier.send(&content)).await {
            Ok(result) => result,
            Err(_) => Err(NotifierError::Timeout),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    notifier = self.notifier.name(),
                    severity = %message.severity,
                    "Alert sent"
                );
                DispatchResult::delivered()
            }
            Err(e) => {
                tracing::error!(
                    notifier = self.notifier.name(),
                    severity = %message.severity,
                    error = %e,
                    "Failed to send alert"
                );
                DispatchResult::failed(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, content: &str) -> Result<(), NotifierError> {
            self.sent.lock().push(content.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct RejectingNotifier;

    #[async_trait]
    impl Notifier for RejectingNotifier {
        async fn send(&self, _content: &str) -> Result<(), NotifierError> {
            Err(NotifierError::Rejected {
                status: 429,
                body: "rate limited".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "rejecting"
        }
    }

    struct StalledNotifier;

    #[async_trait]
    impl Notifier for StalledNotifier {
        async fn send(&self, _content: &str) -> Result<(), NotifierError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_rendered_message() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone());

        let result = dispatcher.dispatch(&AlertMessage::critical("down")).await;

        assert!(result.delivered);
        assert!(result.detail.is_none());
        assert_eq!(notifier.sent.lock().as_slice(), ["[CRITICAL] down"]);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported_not_raised() {
        let dispatcher = AlertDispatcher::new(Arc::new(RejectingNotifier));

        let result = dispatcher.dispatch(&AlertMessage::warning("slow")).await;

        assert!(!result.delivered);
        let detail = result.detail.unwrap();
        assert!(detail.contains("429"));
        assert!(detail.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_dispatch_times_out() {
        let dispatcher = AlertDispatcher::new(Arc::new(StalledNotifier))
            .with_timeout(Duration::from_millis(20));

        let result = dispatcher.dispatch(&AlertMessage::critical("down")).await;

        assert!(!result.delivered);
        assert_eq!(result.detail.as_deref(), Some("Notifier timed out"));
    }
}
