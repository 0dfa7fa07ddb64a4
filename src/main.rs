use task_tracker::{api, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("task_tracker=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        timezone = %config.timezone.name(),
        dev_mode = config.dev_mode,
        "Starting task-tracker {}",
        env!("CARGO_PKG_VERSION")
    );

    api::serve(config).await
}
