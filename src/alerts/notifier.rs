//! Notification channels for alerts

use async_trait::async_trait;
use reqwest::StatusCode;

/// Delivers alert text to an operator-facing channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, content: &str) -> Result<(), NotifierError>;

    /// Short channel name for logs
    fn name(&self) -> &'static str;
}

/// Chat-style webhook taking `{"content": ...}` and acknowledging with 204
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, content: &str) -> Result<(), NotifierError> {
        let payload = serde_json::json!({ "content": content });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(format!("Failed to send webhook: {}", e)))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Webhook notification sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Writes alerts to the log; used when no webhook is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, content: &str) -> Result<(), NotifierError> {
        tracing::warn!("Alert triggered: {}", content);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Notifier timed out")]
    Timeout,
}
