//! Email relay endpoint.
//!
//! Lets the browser send an email without holding the provider key:
//! `POST {to, subject, html}` answers `{success: true, data}` or `{error}`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use super::error::ApiError;
use super::routes::AppState;
use crate::notify::OutgoingEmail;

#[derive(Debug, Default, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

impl SendEmailRequest {
    fn into_email(self) -> Option<OutgoingEmail> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(OutgoingEmail {
            to: present(self.to)?.trim().to_string(),
            subject: present(self.subject)?,
            html: present(self.html)?,
        })
    }
}

/// POST /api/send-email
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let missing = || ApiError::BadRequest("Missing required fields".to_string());
    let Json(req) = payload.map_err(|e| {
        tracing::debug!("Rejected relay body: {}", e.body_text());
        missing()
    })?;
    let email = req.into_email().ok_or_else(missing)?;

    let sender = state
        .relay
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Email delivery is not configured".to_string()))?;

    let data = sender
        .send(&email)
        .await
        .inspect_err(|e| tracing::error!(to = %email.to, "Failed to relay email: {}", e))?;
    tracing::info!(to = %email.to, "Relayed email");
    Ok(Json(serde_json::json!({ "success": true, "data": data })))
}

/// Any other method on the relay endpoint.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
