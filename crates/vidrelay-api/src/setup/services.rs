//! Service initialization

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use vidrelay_core::Config;
use vidrelay_processing::Downscaler;
use vidrelay_source::{DriveClient, SourceApi};
use vidrelay_storage::create_storage;
use vidrelay_transfer::{TransferOptions, TransferPipeline};

/// Build the source client, storage backend, pipeline and downscaler.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let timeout = Duration::from_secs(config.http_timeout_secs());

    let source: Arc<dyn SourceApi> = Arc::new(
        DriveClient::new(
            config.drive_api_base_url(),
            config.google_access_token().map(String::from),
            timeout,
        )
        .context("Failed to create Drive client")?,
    );

    tracing::info!("Initializing storage abstraction...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    let storage_backend = storage.backend_type();
    tracing::info!(
        backend = %storage_backend,
        container = %config.gcs_bucket_name(),
        "Storage abstraction initialized successfully"
    );

    let options = TransferOptions::from_config(config);
    tracing::info!(
        chunk_size_bytes = options.chunk_size,
        content_type_prefix = %options.expected_content_type_prefix,
        "Transfer pipeline configured"
    );

    let source_name = source.source_name();
    let pipeline = TransferPipeline::new(source, storage.clone(), options);
    let downscaler = Downscaler::new(
        storage,
        config.ffmpeg_path(),
        config.downscale_factor(),
        config.chunk_size_bytes(),
    )
    .context("Failed to create downscaler")?;

    Ok(Arc::new(AppState::new(
        pipeline,
        downscaler,
        storage_backend,
        source_name,
    )))
}
