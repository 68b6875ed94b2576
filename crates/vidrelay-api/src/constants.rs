/// Service version reported by `/health` and the OpenAPI document.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest accepted request body. Requests carry identifiers, never media.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Hint returned when `/transfer` is called without an identifier.
pub const TRANSFER_USAGE: &str =
    r#"Send POST with {"file_id": "your-file-id", "gcs_destination_path": "optional/path.mp4"}"#;

/// Requests served at once. Each transfer holds up to one chunk in memory.
pub const HTTP_CONCURRENCY_LIMIT: usize = 8;
