//! Source abstraction trait
//!
//! This module defines the SourceApi trait that every source content API
//! client implements, plus the stream handle shared by all of them.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use vidrelay_core::models::SourceObjectMetadata;

/// Source operation errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source object not found: {0}")]
    NotFound(String),

    #[error("Permission denied for source object: {0}")]
    PermissionDenied(String),

    #[error("Source request failed: {0}")]
    RequestFailed(String),

    #[error("Source read failed: {0}")]
    ReadFailed(String),

    #[error("Invalid source response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Position of an open media stream.
///
/// The handle only moves forward: every successful read advances it by
/// exactly the number of bytes returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    object_id: String,
    position: u64,
    total_size: Option<u64>,
    done: bool,
}

impl StreamHandle {
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            position: 0,
            total_size: None,
            done: false,
        }
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Offset of the next byte to read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total object size, once the source has reported it.
    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Record `len` bytes read at the current position. The stream is done
    /// once the position reaches the reported total.
    pub fn record_read(&mut self, len: u64, total_size: Option<u64>) {
        self.position += len;
        if total_size.is_some() {
            self.total_size = total_size;
        }
        if let Some(total) = self.total_size {
            if self.position >= total {
                self.done = true;
            }
        }
    }

    /// Mark the stream exhausted regardless of the reported total.
    pub fn finish(&mut self) {
        self.total_size.get_or_insert(self.position);
        self.done = true;
    }

    /// Fraction of the object read so far, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self.total_size {
            Some(0) => 1.0,
            Some(total) => (self.position as f64 / total as f64).min(1.0),
            None if self.done => 1.0,
            None => 0.0,
        }
    }
}

/// Outcome of one `read_next` call.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub data: Bytes,
    pub progress: f64,
    pub done: bool,
}

/// Source content API abstraction trait
///
/// Implementations must return contiguous ranges: the bytes returned by
/// `read_next` always start at `handle.position()` before the call.
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Resolve descriptive metadata with a single lookup.
    ///
    /// `include_shared_containers` must be honored so objects owned by a
    /// shared/team container are found.
    async fn get_metadata(
        &self,
        object_id: &str,
        include_shared_containers: bool,
    ) -> SourceResult<SourceObjectMetadata>;

    /// Open a media stream positioned at the first byte of the object.
    async fn open_media_stream(&self, object_id: &str) -> SourceResult<StreamHandle>;

    /// Read at most `max_bytes` bytes from the current position.
    async fn read_next(&self, handle: &mut StreamHandle, max_bytes: usize)
        -> SourceResult<ReadOutcome>;

    /// Human-readable source name for logs
    fn source_name(&self) -> &'static str;
}
