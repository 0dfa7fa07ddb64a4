//! Authentication against the managed backend.
//!
//! - Sign-in, password recovery and password changes are proxied to the auth
//!   provider; the service never stores credentials.
//! - Protected endpoints require `Authorization: Bearer <access token>`. The
//!   token is verified locally with the backend's JWT secret (HS256, audience
//!   `authenticated`).
//! - Admins are the accounts listed in `ADMIN_EMAILS`.
//! - When `DEV_MODE=true`, auth is skipped and requests run as an admin.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::routes::AppState;
use crate::config::Config;
use crate::store::{AuthGateway, Session};

pub const MIN_PASSWORD_LENGTH: usize = 6;
/// Identity every request runs as in dev mode.
pub(crate) const DEV_USER_ID: &str = "dev";
pub(crate) const DEV_USER_EMAIL: &str = "dev@localhost";
const AUDIENCE: &str = "authenticated";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub aud: Option<String>,
}

/// The caller of a protected endpoint.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub is_admin: bool,
    /// Raw access token, forwarded for password changes.
    pub token: String,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

fn verify_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

fn user_for_claims(claims: Claims, token: &str, config: &Config) -> AuthUser {
    let is_admin = claims
        .email
        .as_deref()
        .map(|email| config.is_admin_email(email))
        .unwrap_or(false);
    AuthUser {
        id: claims.sub,
        email: claims.email,
        is_admin,
        token: token.to_string(),
    }
}

fn bearer_token(req: &Request<Body>) -> &str {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("")
        .trim()
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Dev mode => no auth checks.
    if state.config.dev_mode {
        req.extensions_mut().insert(AuthUser {
            id: DEV_USER_ID.to_string(),
            email: Some(DEV_USER_EMAIL.to_string()),
            is_admin: true,
            token: String::new(),
        });
        return next.run(req).await;
    }

    // Fail closed when tokens cannot be verified.
    let Some(secret) = state.config.jwt_secret.as_deref() else {
        return ApiError::Internal("SUPABASE_JWT_SECRET not configured".to_string())
            .into_response();
    };

    let token = bearer_token(&req).to_string();
    if token.is_empty() {
        return ApiError::Unauthorized("Missing Authorization header".to_string()).into_response();
    }

    match verify_jwt(&token, secret) {
        Ok(claims) => {
            let user = user_for_claims(claims, &token, &state.config);
            tracing::debug!(user_id = %user.id, admin = user.is_admin, "Authenticated request");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Rejected token: {}", e);
            ApiError::Unauthorized("Invalid or expired token".to_string()).into_response()
        }
    }
}

fn gateway(state: &AppState) -> Result<&dyn AuthGateway, ApiError> {
    state
        .auth_gateway
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("Authentication backend not configured".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".to_string()));
    }

    let session = gateway(&state)?
        .sign_in(req.email.trim(), &req.password)
        .await
        .map_err(|e| {
            tracing::info!("Sign-in failed for {}: {}", req.email.trim(), e);
            ApiError::Unauthorized("Invalid email or password".to_string())
        })?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct RecoverRequest {
    #[serde(default)]
    pub email: String,
}

/// POST /api/auth/recover
pub async fn recover(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecoverRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let email = req.email.trim();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }

    gateway(&state)?
        .send_recovery(email, state.config.app_url.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirmation: String,
}

/// Check a new password before it is sent to the auth provider.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password != confirmation {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

/// POST /api/auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    validate_new_password(&req.password, &req.confirmation).map_err(ApiError::BadRequest)?;

    gateway(&state)?
        .update_password(&user.token, &req.password)
        .await?;
    tracing::info!(user_id = %user.id, "Password changed");
    Ok(Json(serde_json::json!({ "success": true })))
}
