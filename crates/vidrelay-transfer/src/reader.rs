//! Source side of the pipeline: bounded, contiguous chunk pulls.

use bytes::Bytes;
use std::sync::Arc;
use vidrelay_core::models::SourceObjectMetadata;
use vidrelay_source::{SourceApi, StreamHandle};

use crate::error::TransferError;

/// One pull from the source.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub data: Bytes,
    pub is_final: bool,
}

/// Reject objects whose declared content type is outside the expected class.
pub fn validate_content_type(
    metadata: &SourceObjectMetadata,
    expected_prefix: &str,
) -> Result<(), TransferError> {
    if metadata.has_content_type_prefix(expected_prefix) {
        Ok(())
    } else {
        Err(TransferError::Validation(format!(
            "File must be a {}* type, but got: {}",
            expected_prefix,
            if metadata.content_type.is_empty() {
                "unknown"
            } else {
                metadata.content_type.as_str()
            }
        )))
    }
}

/// Pulls a source object's bytes in chunks of at most `chunk_size`.
///
/// Every chunk starts where the previous one ended. Once a final chunk has
/// been returned, further calls yield an empty final chunk without touching
/// the source.
pub struct SourceReader {
    api: Arc<dyn SourceApi>,
    handle: StreamHandle,
    declared_length: u64,
    chunk_size: usize,
    bytes_read: u64,
    finished: bool,
}

impl SourceReader {
    /// Open a media stream for an object whose metadata is already resolved.
    pub async fn open(
        api: Arc<dyn SourceApi>,
        metadata: &SourceObjectMetadata,
        chunk_size: usize,
    ) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::Validation(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        let handle = api.open_media_stream(&metadata.id).await?;
        Ok(Self {
            api,
            handle,
            declared_length: metadata.byte_length,
            chunk_size,
            bytes_read: 0,
            finished: false,
        })
    }

    pub async fn next_chunk(&mut self) -> Result<ChunkResult, TransferError> {
        if self.finished {
            return Ok(ChunkResult {
                data: Bytes::new(),
                is_final: true,
            });
        }

        let outcome = self
            .api
            .read_next(&mut self.handle, self.chunk_size)
            .await
            .map_err(|e| TransferError::TransferIo(e.to_string()))?;

        let len = outcome.data.len();
        if len > self.chunk_size {
            return Err(TransferError::TransferIo(format!(
                "source returned {} bytes for a {} byte read",
                len, self.chunk_size
            )));
        }
        if self.bytes_read + len as u64 > self.declared_length {
            return Err(TransferError::TransferIo(format!(
                "source returned bytes past its declared length of {}",
                self.declared_length
            )));
        }
        if len == 0 && !outcome.done {
            return Err(TransferError::TransferIo(format!(
                "source returned no data at offset {} without finishing",
                self.bytes_read
            )));
        }

        self.bytes_read += len as u64;
        self.finished = outcome.done;

        tracing::debug!(
            offset = self.bytes_read - len as u64,
            size_bytes = len,
            progress_percent = (outcome.progress * 100.0).round(),
            "Source chunk read"
        );

        Ok(ChunkResult {
            data: outcome.data,
            is_final: outcome.done,
        })
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Fraction of the object read, as reported by the source.
    pub fn progress(&self) -> f64 {
        self.handle.progress()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
