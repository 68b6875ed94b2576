//! Configuration module
//!
//! Environment-supplied settings for the HTTP server, the Drive source, the
//! destination storage backend, the transfer pipeline and the transcode helper.

use std::env;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 8080;
const HTTP_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BUCKET_NAME: &str = "n8n-test-bucket-for-video";
const GCS_API_BASE_URL: &str = "https://storage.googleapis.com";
const DRIVE_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const EXPECTED_CONTENT_TYPE_PREFIX: &str = "video/";
const DOWNSCALE_FACTOR: f64 = 0.5;

/// 100 MiB, the peak memory held by one transfer.
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 100 * 1024 * 1024;

/// GCS resumable uploads require every non-final chunk to be a multiple of 256 KiB.
pub const GCS_CHUNK_ALIGNMENT: usize = 256 * 1024;

/// Base configuration for the HTTP service
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub http_timeout_secs: u64,
}

/// How a destination path is derived when the request does not carry one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DestinationPathPolicy {
    /// Use the source object's display name as-is.
    DisplayName,
    /// Place the display name under a fixed prefix: `{prefix}/{display_name}`.
    Prefixed(String),
}

impl DestinationPathPolicy {
    pub fn derive(&self, display_name: &str) -> String {
        match self {
            DestinationPathPolicy::DisplayName => display_name.to_string(),
            DestinationPathPolicy::Prefixed(prefix) => {
                format!("{}/{}", prefix.trim_end_matches('/'), display_name)
            }
        }
    }
}

/// Relay service configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub base: BaseConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub gcs_bucket_name: String,
    pub gcs_api_base_url: String,
    pub local_storage_path: Option<String>,
    // Source configuration
    pub drive_api_base_url: String,
    pub google_access_token: Option<String>,
    // Transfer configuration
    pub chunk_size_bytes: usize,
    pub expected_content_type_prefix: String,
    pub destination_path_policy: DestinationPathPolicy,
    // Transcode configuration
    pub ffmpeg_path: String,
    pub downscale_factor: f64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<RelayConfig>);

impl Config {
    fn as_relay(&self) -> &RelayConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_relay().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let _ = dotenvy::dotenv();
        let config = RelayConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_relay().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_relay().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_relay().base.environment
    }

    pub fn http_timeout_secs(&self) -> u64 {
        self.as_relay().base.http_timeout_secs
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_relay().storage_backend
    }

    pub fn gcs_bucket_name(&self) -> &str {
        &self.as_relay().gcs_bucket_name
    }

    pub fn gcs_api_base_url(&self) -> &str {
        &self.as_relay().gcs_api_base_url
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_relay().local_storage_path.as_deref()
    }

    pub fn drive_api_base_url(&self) -> &str {
        &self.as_relay().drive_api_base_url
    }

    pub fn google_access_token(&self) -> Option<&str> {
        self.as_relay().google_access_token.as_deref()
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.as_relay().chunk_size_bytes
    }

    pub fn expected_content_type_prefix(&self) -> &str {
        &self.as_relay().expected_content_type_prefix
    }

    pub fn destination_path_policy(&self) -> &DestinationPathPolicy {
        &self.as_relay().destination_path_policy
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.as_relay().ffmpeg_path
    }

    pub fn downscale_factor(&self) -> f64 {
        self.as_relay().downscale_factor
    }
}

impl RelayConfig {
    /// Build the configuration from a key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let storage_backend = match non_empty("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::Gcs,
        };

        let destination_path_policy = match non_empty("DEFAULT_DESTINATION_PREFIX") {
            Some(prefix) => DestinationPathPolicy::Prefixed(prefix.trim_matches('/').to_string()),
            None => DestinationPathPolicy::DisplayName,
        };

        let config = RelayConfig {
            base: BaseConfig {
                server_port: non_empty("PORT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(SERVER_PORT),
                environment: non_empty("ENVIRONMENT")
                    .or_else(|| non_empty("APP_ENV"))
                    .unwrap_or_else(|| "development".to_string()),
                http_timeout_secs: non_empty("HTTP_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(HTTP_TIMEOUT_SECS),
            },
            storage_backend,
            gcs_bucket_name: non_empty("GCS_BUCKET_NAME")
                .unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string()),
            gcs_api_base_url: non_empty("GCS_API_BASE_URL")
                .unwrap_or_else(|| GCS_API_BASE_URL.to_string()),
            local_storage_path: non_empty("LOCAL_STORAGE_PATH"),
            drive_api_base_url: non_empty("DRIVE_API_BASE_URL")
                .unwrap_or_else(|| DRIVE_API_BASE_URL.to_string()),
            google_access_token: non_empty("GOOGLE_ACCESS_TOKEN"),
            chunk_size_bytes: non_empty("TRANSFER_CHUNK_SIZE_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_SIZE_BYTES),
            expected_content_type_prefix: non_empty("EXPECTED_CONTENT_TYPE_PREFIX")
                .unwrap_or_else(|| EXPECTED_CONTENT_TYPE_PREFIX.to_string()),
            destination_path_policy,
            ffmpeg_path: non_empty("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            downscale_factor: non_empty("DOWNSCALE_FACTOR")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DOWNSCALE_FACTOR),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "TRANSFER_CHUNK_SIZE_BYTES must be greater than 0"
            ));
        }

        if self.expected_content_type_prefix.is_empty() {
            return Err(anyhow::anyhow!(
                "EXPECTED_CONTENT_TYPE_PREFIX cannot be empty"
            ));
        }

        if !(self.downscale_factor > 0.0 && self.downscale_factor <= 1.0) {
            return Err(anyhow::anyhow!(
                "DOWNSCALE_FACTOR must be in (0, 1], got {}",
                self.downscale_factor
            ));
        }

        match self.storage_backend {
            StorageBackend::Gcs => {
                if self.gcs_bucket_name.is_empty() {
                    return Err(anyhow::anyhow!(
                        "GCS_BUCKET_NAME must be set when using GCS storage backend"
                    ));
                }
                if self.chunk_size_bytes % GCS_CHUNK_ALIGNMENT != 0 {
                    return Err(anyhow::anyhow!(
                        "TRANSFER_CHUNK_SIZE_BYTES must be a multiple of {} bytes for GCS resumable uploads",
                        GCS_CHUNK_ALIGNMENT
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
