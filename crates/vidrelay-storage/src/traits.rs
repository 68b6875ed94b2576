//! Storage abstraction trait
//!
//! This module defines the Storage trait that all destination backends must
//! implement, built around a resumable session: open once, commit contiguous
//! byte ranges, and the object becomes visible only on the final commit.

use crate::location::BlobLocation;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid blob location: {0}")]
    InvalidLocation(String),

    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Streamed object body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Outcome of committing one byte range to a resumable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    /// Range durably buffered; more bytes are expected.
    Incomplete,
    /// Object finalized and visible.
    Complete,
    /// The store answered with a status outside the protocol.
    Rejected { status: u16, detail: String },
}

/// Opaque handle to an open resumable upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    location: BlobLocation,
    content_type: String,
    session_uri: String,
}

impl SessionHandle {
    pub fn new(
        location: BlobLocation,
        content_type: impl Into<String>,
        session_uri: impl Into<String>,
    ) -> Self {
        Self {
            location,
            content_type: content_type.into(),
            session_uri: session_uri.into(),
        }
    }

    pub fn location(&self) -> &BlobLocation {
        &self.location
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Backend-specific session address (GCS session URL, local staging file)
    pub fn session_uri(&self) -> &str {
        &self.session_uri
    }
}

/// Format the `Content-Range` declaration for a non-empty chunk.
pub fn content_range(start_offset: u64, len: u64, total_size: u64) -> StorageResult<String> {
    if len == 0 {
        return Err(StorageError::InvalidRange(
            "cannot declare a range for an empty chunk".to_string(),
        ));
    }
    let last = start_offset + len - 1;
    if last >= total_size {
        return Err(StorageError::InvalidRange(format!(
            "range {}-{} exceeds declared total {}",
            start_offset, last, total_size
        )));
    }
    Ok(format!("bytes {}-{}/{}", start_offset, last, total_size))
}

/// Storage abstraction trait
///
/// All destination backends (GCS, local filesystem) must implement this trait.
/// The transfer pipeline drives it without knowing which backend is behind it.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a resumable session for `location`, declaring its content type.
    async fn open_resumable_session(
        &self,
        location: &BlobLocation,
        content_type: &str,
    ) -> StorageResult<SessionHandle>;

    /// Commit `data` at `start_offset` of an object of `total_size` bytes.
    ///
    /// Ranges must be contiguous and non-empty. Transport failures are
    /// errors; unexpected store statuses come back as `CommitStatus::Rejected`.
    async fn commit_range(
        &self,
        session: &SessionHandle,
        data: Bytes,
        start_offset: u64,
        total_size: u64,
    ) -> StorageResult<CommitStatus>;

    /// Finalize a session as a zero-byte object.
    async fn finalize_empty(&self, session: &SessionHandle) -> StorageResult<CommitStatus>;

    /// Download an object as a stream (for large files)
    ///
    /// The stream yields `Bytes` chunks as they become available.
    async fn download_stream(&self, location: &BlobLocation) -> StorageResult<ByteStream>;

    /// Canonical URI of an object in this backend
    fn object_uri(&self, location: &BlobLocation) -> String {
        location.to_string()
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Collect a streamed body; only for small objects and tests.
pub async fn collect_stream(mut stream: ByteStream) -> StorageResult<Vec<u8>> {
    use futures::StreamExt;

    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}
