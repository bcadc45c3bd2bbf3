//! HTTP entry point for the prediction form.

use anyhow::Result;
use clap::Parser;
use evasao_web::{AppState, ModelHandle, WebConfig, router};
use tracing::info;

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `--log-level`.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = WebConfig::parse();
    init_logging(&config.log_level, config.quiet);

    let model_path = config.model_path();
    info!(model = %model_path.display(), "Starting prediction form");

    let state = AppState::new(ModelHandle::new(model_path));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(listen = %config.listen, "Listening on http://{}", config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
