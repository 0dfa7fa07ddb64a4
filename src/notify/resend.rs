//! Resend transactional email API client.

use async_trait::async_trait;
use reqwest::Client;

use super::{error_message, EmailSender, NotifyError, OutgoingEmail};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendClient {
    client: Client,
    api_key: String,
    from: String,
    api_url: String,
}

impl ResendClient {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from,
            api_url: RESEND_API_URL.to_string(),
        }
    }

    /// Point the client at another endpoint.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<serde_json::Value, NotifyError> {
        let body = serde_json::json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
        });

        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn emails(headers: HeaderMap, Json(body): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer re_test");
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "API key is invalid" })),
            );
        }
        (
            StatusCode::OK,
            Json(serde_json::json!({ "id": "msg-1", "to": body["to"], "from": body["from"] })),
        )
    }

    async fn spawn_api() -> String {
        let app = Router::new().route("/emails", post(emails));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/emails", addr)
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "ana@example.com".to_string(),
            subject: "New task".to_string(),
            html: "<p>Hello</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_wraps_recipient_and_sender() {
        let url = spawn_api().await;
        let client = ResendClient::new("re_test".to_string(), "Tasks <tasks@example.com>".to_string())
            .with_api_url(&url);

        let data = client.send(&email()).await.unwrap();
        assert_eq!(data["id"], "msg-1");
        assert_eq!(data["to"], serde_json::json!(["ana@example.com"]));
        assert_eq!(data["from"], "Tasks <tasks@example.com>");
    }

    #[tokio::test]
    async fn test_rejection_carries_provider_message() {
        let url = spawn_api().await;
        let client = ResendClient::new("wrong".to_string(), "tasks@example.com".to_string())
            .with_api_url(&url);

        match client.send(&email()).await {
            Err(NotifyError::Rejected { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "API key is invalid");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
