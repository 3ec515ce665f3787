//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use sharebox_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        storage_backend = ?config.storage_backend(),
        "Configuration loaded and validated successfully"
    );

    let repository = database::setup_repository(&config).await?;
    let state = services::initialize_services(&config, repository).await?;
    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}
