//! Router assembly and server startup.

use std::sync::Arc;

use axum::middleware;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::notify::{DisabledSender, EmailSender, RelayClient, ResendClient};
use crate::store::{AuthGateway, MemoryStore, SupabaseClient, TaskStore};
use crate::task::{DeadlinePolicy, Profile};

use super::auth;
use super::email;
use super::report;
use super::tasks;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TaskStore>,
    /// Sends task notifications
    pub mailer: Arc<dyn EmailSender>,
    /// Provider behind the public relay endpoint
    pub relay: Option<Arc<dyn EmailSender>>,
    /// `None` when running without a backend
    pub auth_gateway: Option<Arc<dyn AuthGateway>>,
    pub policy: DeadlinePolicy,
}

impl AppState {
    /// Wire up backends from configuration.
    pub fn from_config(config: Config) -> Self {
        let (store, auth_gateway): (Arc<dyn TaskStore>, Option<Arc<dyn AuthGateway>>) =
            match &config.supabase {
                Some(supabase) => {
                    let client = Arc::new(SupabaseClient::new(
                        &supabase.url,
                        &supabase.service_role_key,
                        &supabase.anon_key,
                    ));
                    tracing::info!("Using Supabase backend at {}", supabase.url);
                    (
                        client.clone() as Arc<dyn TaskStore>,
                        Some(client as Arc<dyn AuthGateway>),
                    )
                }
                None => {
                    let profiles = memory_profiles(&config);
                    tracing::warn!(
                        profiles = profiles.len(),
                        "SUPABASE_URL not set, tasks are kept in memory"
                    );
                    (
                        Arc::new(MemoryStore::with_profiles(profiles)) as Arc<dyn TaskStore>,
                        None,
                    )
                }
            };

        let relay: Option<Arc<dyn EmailSender>> = config.resend.as_ref().map(|resend| {
            Arc::new(ResendClient::new(resend.api_key.clone(), resend.from.clone()))
                as Arc<dyn EmailSender>
        });

        let mailer: Arc<dyn EmailSender> = match (&config.email_relay_url, &relay) {
            (Some(url), _) => {
                tracing::info!("Sending notifications through relay {}", url);
                Arc::new(RelayClient::new(url))
            }
            (None, Some(resend)) => Arc::clone(resend),
            (None, None) => {
                tracing::info!("Email notifications disabled (no provider configured)");
                Arc::new(DisabledSender)
            }
        };

        Self {
            policy: DeadlinePolicy::new(config.timezone),
            config,
            store,
            mailer,
            relay,
            auth_gateway,
        }
    }
}

/// `DEV_PROFILES`, plus the dev user in dev mode so tasks can be assigned.
fn memory_profiles(config: &Config) -> Vec<Profile> {
    let mut profiles = config.dev_profiles.clone();
    if config.dev_mode && !profiles.iter().any(|p| p.id == auth::DEV_USER_ID) {
        profiles.push(Profile {
            id: auth::DEV_USER_ID.to_string(),
            name: "Dev User".to_string(),
            email: Some(auth::DEV_USER_EMAIL.to_string()),
            active: true,
        });
    }
    profiles
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/recover", post(auth::recover))
        .route(
            "/api/send-email",
            post(email::send_email).fallback(email::method_not_allowed),
        );

    let protected_routes = Router::new()
        .route("/api/auth/password", post(auth::change_password))
        .route("/api/profiles", get(tasks::list_profiles))
        .nest("/api/tasks", tasks::routes())
        .nest("/api/report", report::routes())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    if config.dev_mode {
        tracing::warn!("DEV_MODE enabled: authentication is disabled");
    }

    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for SIGTERM/SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dev_mode: bool,
    pub backend: String,
    pub timezone: String,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backend = if state.config.supabase.is_some() {
        "supabase"
    } else {
        "memory"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dev_mode: state.config.dev_mode,
        backend: backend.to_string(),
        timezone: state.policy.timezone().name().to_string(),
    })
}
