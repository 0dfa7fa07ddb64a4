//! Outbound email notifications.
//!
//! Emails are fire-and-report: callers log a failed send and carry on, a
//! notification never fails the write that triggered it.

mod relay;
mod resend;
mod templates;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use relay::RelayClient;
pub use resend::ResendClient;
pub use templates::{new_task_email, task_completed_email, CompletedTaskEmail, NewTaskEmail};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to decode email response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Email delivery is not configured")]
    NotConfigured,
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one email. Returns the provider's response body.
    async fn send(&self, email: &OutgoingEmail) -> Result<serde_json::Value, NotifyError>;
}

/// Sender used when no email provider is configured.
pub struct DisabledSender;

#[async_trait]
impl EmailSender for DisabledSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<serde_json::Value, NotifyError> {
        tracing::debug!(to = %email.to, subject = %email.subject, "Email delivery disabled, dropping");
        Err(NotifyError::NotConfigured)
    }
}

/// Send an email, logging instead of returning failures.
pub async fn deliver(sender: &dyn EmailSender, email: OutgoingEmail) {
    match sender.send(&email).await {
        Ok(_) => tracing::info!(to = %email.to, subject = %email.subject, "Email sent"),
        Err(NotifyError::NotConfigured) => {}
        Err(e) => tracing::warn!(to = %email.to, "Failed to send email: {}", e),
    }
}

/// Extract a readable message from an error response body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSender;
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "ana@example.com".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
        }
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"bad"}"#), "bad");
        assert_eq!(error_message(r#"{"message":"invalid from"}"#), "invalid from");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn test_deliver_swallows_failures() {
        let sender = RecordingSender::failing();
        deliver(&sender, email()).await;
        assert_eq!(sender.sent().len(), 1);

        deliver(&DisabledSender, email()).await;
    }
}
