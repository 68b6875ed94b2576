//! Application setup and initialization
//!
//! Initialization logic lives here rather than in main.rs so tests can build
//! the same router against their own collaborators.

pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use vidrelay_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let state = services::initialize_services(&config).await?;

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
