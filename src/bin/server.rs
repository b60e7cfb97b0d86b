//! HTTP server for the pipeline builder: JSON endpoint plus the interactive form

use anyhow::{Context, Result};
use pipeline_builder::config::Settings;
use pipeline_builder::gateway::{serve, AppState};
use pipeline_builder::telemetry::init_tracing;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env().context("failed to load settings")?;
    init_tracing(settings.log_filter());

    info!(
        "Starting pipeline builder ({} environment, model {}, default target {})",
        settings.app_env, settings.openai_model, settings.default_target
    );

    let state = AppState::from_settings(&settings).context("failed to initialize gateway")?;

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!("Form available at http://{}/", settings.bind_addr);

    serve(listener, Arc::new(state)).await?;
    Ok(())
}
