//! Client for a `/api/send-email` relay endpoint.

use async_trait::async_trait;
use reqwest::Client;

use super::{error_message, EmailSender, NotifyError, OutgoingEmail};

/// Posts `{to, subject, html}` to a relay, which holds the provider key.
pub struct RelayClient {
    client: Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for RelayClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<serde_json::Value, NotifyError> {
        let resp = self.client.post(&self.endpoint).json(email).send().await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let body: serde_json::Value = serde_json::from_str(&text)?;
        Ok(body.get("data").cloned().unwrap_or(body))
    }
}
