//! Configuration validation
//!
//! Checks run once at startup, on top of `Config::validate`, for settings that
//! only matter when the HTTP service is actually going to serve traffic.

use anyhow::Result;
use vidrelay_core::{Config, StorageBackend};

/// Validate critical configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.google_access_token().is_none() {
        if config.is_production() {
            return Err(anyhow::anyhow!(
                "GOOGLE_ACCESS_TOKEN must be set in production"
            ));
        }
        tracing::warn!("GOOGLE_ACCESS_TOKEN not set - Google API requests will be unauthenticated");
    }

    if config.is_production() && config.storage_backend() == StorageBackend::Local {
        tracing::warn!(
            path = ?config.local_storage_path(),
            "Local storage backend in production - transferred objects stay on this host"
        );
    }

    if config.server_port() == 0 {
        return Err(anyhow::anyhow!("PORT cannot be 0"));
    }

    Ok(())
}
