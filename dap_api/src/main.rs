use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use dap_api::{app::app, config::Config, state::AppState};
use tracing::info;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename("./.env.local").ok();

    let config = Config::from_env().context("Invalid configuration")?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let state = Arc::new(AppState::from_config(&config)?);
    let app = app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Could not bind to {}", config.bind_address))?;

    info!(
        "Listening on {} with prefix '{}', backend {}",
        config.bind_address, config.api_prefix, config.ors_backend_url
    );

    serve(listener, app).await.context("Server stopped")?;

    Ok(())
}
