//! vidrelay core library
//!
//! Domain models, error types and configuration shared by every vidrelay
//! component: the source client, the storage backends, the transfer pipeline,
//! the transcode helper and the HTTP API.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, DestinationPathPolicy, RelayConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
