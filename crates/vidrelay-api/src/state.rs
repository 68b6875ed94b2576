//! Application state shared by all handlers.

use std::sync::Arc;
use vidrelay_processing::Downscaler;
use vidrelay_storage::StorageBackend;
use vidrelay_transfer::TransferPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TransferPipeline>,
    pub downscaler: Arc<Downscaler>,
    /// Backend holding transferred objects, reported by `/health`.
    pub storage_backend: StorageBackend,
    /// Name of the source API, reported by `/health`.
    pub source_name: &'static str,
}

impl AppState {
    pub fn new(
        pipeline: TransferPipeline,
        downscaler: Downscaler,
        storage_backend: StorageBackend,
        source_name: &'static str,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            downscaler: Arc::new(downscaler),
            storage_backend,
            source_name,
        }
    }
}
