//! Transfer orchestration: metadata lookup, validation, then the
//! pull-one-chunk/commit-one-chunk loop.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;
use vidrelay_core::config::DEFAULT_CHUNK_SIZE_BYTES;
use vidrelay_core::models::{SourceObjectMetadata, TransferReceipt, TransferRequest};
use vidrelay_core::{Config, DestinationPathPolicy};
use vidrelay_source::SourceApi;
use vidrelay_storage::{BlobLocation, CommitStatus, Storage};

use crate::error::{TransferError, TransferFailure};
use crate::reader::{validate_content_type, SourceReader};
use crate::session::{TransferProgress, TransferSession};
use crate::writer::SinkWriter;

/// Lifecycle of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Init,
    MetadataFetched,
    Validating,
    Streaming,
    Completed,
    Failed,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Init => "init",
            TransferState::MetadataFetched => "metadata_fetched",
            TransferState::Validating => "validating",
            TransferState::Streaming => "streaming",
            TransferState::Completed => "completed",
            TransferState::Failed => "failed",
        }
    }
}

impl Display for TransferState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Knobs of a pipeline, usually taken from `Config`.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub chunk_size: usize,
    pub expected_content_type_prefix: String,
    /// Bucket (GCS) or directory (local) receiving transferred objects.
    pub destination_container: String,
    pub path_policy: DestinationPathPolicy,
}

impl TransferOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size_bytes(),
            expected_content_type_prefix: config.expected_content_type_prefix().to_string(),
            destination_container: config.gcs_bucket_name().to_string(),
            path_policy: config.destination_path_policy().clone(),
        }
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE_BYTES,
            expected_content_type_prefix: "video/".to_string(),
            destination_container: "n8n-test-bucket-for-video".to_string(),
            path_policy: DestinationPathPolicy::DisplayName,
        }
    }
}

/// Copies source objects into storage, one chunk in flight at a time.
///
/// A pipeline holds only immutable collaborators; each `run` owns its own
/// session, so one pipeline serves concurrent transfers.
pub struct TransferPipeline {
    source: Arc<dyn SourceApi>,
    storage: Arc<dyn Storage>,
    options: TransferOptions,
}

/// Tracks the current state so failures report where they happened.
struct StateTracker {
    state: TransferState,
    bytes_transferred: u64,
}

impl StateTracker {
    fn enter(&mut self, next: TransferState) {
        tracing::info!(from = %self.state, state = %next, "Transfer state transition");
        self.state = next;
    }

    fn fail(&self, error: TransferError) -> TransferFailure {
        tracing::warn!(
            state = %self.state,
            error_kind = error.kind().as_str(),
            bytes_transferred = self.bytes_transferred,
            error = %error,
            "Transfer failed"
        );
        TransferFailure {
            error,
            state: self.state,
            bytes_transferred: self.bytes_transferred,
        }
    }
}

impl TransferPipeline {
    pub fn new(
        source: Arc<dyn SourceApi>,
        storage: Arc<dyn Storage>,
        options: TransferOptions,
    ) -> Self {
        Self {
            source,
            storage,
            options,
        }
    }

    /// Run a transfer, publishing progress after every committed chunk.
    pub async fn run(
        &self,
        request: &TransferRequest,
        progress: Option<&watch::Sender<TransferProgress>>,
    ) -> Result<TransferReceipt, TransferFailure> {
        let transfer_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "transfer",
            %transfer_id,
            object_id = %request.source_object_id()
        );

        async move {
            let started = Instant::now();
            let mut tracker = StateTracker {
                state: TransferState::Init,
                bytes_transferred: 0,
            };

            match self.execute(request, progress, &mut tracker).await {
                Ok(receipt) => {
                    tracker.enter(TransferState::Completed);
                    tracing::info!(
                        destination = %receipt.destination_uri,
                        size_bytes = receipt.bytes_transferred,
                        chunks = receipt.chunks_committed,
                        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                        "Transfer completed"
                    );
                    Ok(receipt)
                }
                Err(error) => {
                    let failure = tracker.fail(error);
                    tracing::info!(
                        from = %failure.state,
                        state = %TransferState::Failed,
                        "Transfer state transition"
                    );
                    Err(failure)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        request: &TransferRequest,
        progress: Option<&watch::Sender<TransferProgress>>,
        tracker: &mut StateTracker,
    ) -> Result<TransferReceipt, TransferError> {
        let metadata = self
            .source
            .get_metadata(request.source_object_id(), true)
            .await?;
        tracker.enter(TransferState::MetadataFetched);

        tracker.enter(TransferState::Validating);
        validate_content_type(&metadata, &self.options.expected_content_type_prefix)?;
        let destination_path =
            request.resolve_destination_path(&metadata, &self.options.path_policy)?;
        let location = BlobLocation::new(
            self.storage.backend_type(),
            self.options.destination_container.clone(),
            destination_path.clone(),
        )?;

        tracker.enter(TransferState::Streaming);
        let session = self
            .stream(&metadata, &location, progress, tracker)
            .await?;

        Ok(TransferReceipt {
            destination_uri: self.storage.object_uri(&location),
            destination_path,
            bytes_transferred: session.bytes_transferred(),
            chunks_committed: session.chunks_committed(),
            file: metadata,
        })
    }

    async fn stream(
        &self,
        metadata: &SourceObjectMetadata,
        location: &BlobLocation,
        progress: Option<&watch::Sender<TransferProgress>>,
        tracker: &mut StateTracker,
    ) -> Result<TransferSession, TransferError> {
        let mut reader =
            SourceReader::open(self.source.clone(), metadata, self.options.chunk_size).await?;
        let mut writer = SinkWriter::open(
            self.storage.clone(),
            location,
            &metadata.content_type,
            metadata.byte_length,
        )
        .await?;
        let mut session = TransferSession::new(metadata.byte_length);

        tracing::info!(
            destination = %location,
            size_bytes = metadata.byte_length,
            chunk_size = self.options.chunk_size,
            "Streaming started"
        );

        while !session.is_done() {
            let chunk = reader.next_chunk().await?;
            let len = chunk.data.len() as u64;

            if len > 0 {
                if writer.is_complete() {
                    return Err(TransferError::UnexpectedCommitStatus(format!(
                        "destination reported complete with {} source bytes remaining",
                        metadata.byte_length.saturating_sub(session.bytes_transferred())
                    )));
                }

                let status = writer
                    .write_chunk(chunk.data, session.bytes_transferred())
                    .await?;
                session.record_commit(len);
                tracker.bytes_transferred = session.bytes_transferred();
                session.publish(progress, reader.progress());

                tracing::info!(
                    offset = session.bytes_transferred() - len,
                    size_bytes = len,
                    progress_percent = (reader.progress() * 100.0).round(),
                    status = ?status,
                    "Chunk committed"
                );
            }

            if chunk.is_final {
                session.mark_source_done();
            }
        }

        if metadata.byte_length == 0 && session.bytes_transferred() == 0 && !writer.is_complete() {
            if let CommitStatus::Complete = writer.finalize_empty().await? {
                session.publish(progress, 1.0);
            }
        }

        if session.bytes_transferred() != metadata.byte_length {
            return Err(TransferError::SizeMismatch {
                declared: metadata.byte_length,
                transferred: session.bytes_transferred(),
            });
        }
        if !writer.is_complete() {
            return Err(TransferError::IncompleteDestination {
                bytes_transferred: session.bytes_transferred(),
            });
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferErrorKind;
    use crate::fakes::{video_metadata, FakeSource, FakeStore};

    const MIB: u64 = 1024 * 1024;

    fn pipeline(source: &Arc<FakeSource>, store: &Arc<FakeStore>, chunk_size: usize) -> TransferPipeline {
        TransferPipeline::new(
            source.clone(),
            store.clone(),
            TransferOptions {
                chunk_size,
                destination_container: "bucket".to_string(),
                ..TransferOptions::default()
            },
        )
    }

    fn request(id: &str) -> TransferRequest {
        TransferRequest::new(id, None).unwrap()
    }

    #[tokio::test]
    async fn test_three_chunk_transfer() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 300 * MIB)));
        let store = Arc::new(FakeStore::new());

        let receipt = pipeline(&source, &store, (100 * MIB) as usize)
            .run(&request("abc123"), None)
            .await
            .unwrap();

        assert_eq!(
            store.commits(),
            vec![(0, 100 * MIB), (100 * MIB, 100 * MIB), (200 * MIB, 100 * MIB)]
        );
        assert_eq!(
            store.statuses(),
            vec![
                CommitStatus::Incomplete,
                CommitStatus::Incomplete,
                CommitStatus::Complete
            ]
        );
        assert_eq!(receipt.bytes_transferred, 300 * MIB);
        assert_eq!(receipt.chunks_committed, 3);
        assert_eq!(receipt.destination_path, "abc123.mp4");
        assert_eq!(receipt.destination_uri, "gs://bucket/abc123.mp4");
        assert_eq!(receipt.file, source.metadata());
        assert_eq!(store.content_type_of("abc123.mp4").as_deref(), Some("video/mp4"));
    }

    #[tokio::test]
    async fn test_wrong_content_type_moves_nothing() {
        let source = Arc::new(FakeSource::new(video_metadata("doc1", "application/pdf", 10 * MIB)));
        let store = Arc::new(FakeStore::new());

        let failure = pipeline(&source, &store, MIB as usize)
            .run(&request("doc1"), None)
            .await
            .unwrap_err();

        assert_eq!(failure.error.kind(), TransferErrorKind::Validation);
        assert_eq!(failure.state, TransferState::Validating);
        assert_eq!(failure.bytes_transferred, 0);
        assert_eq!(source.read_count(), 0);
        assert_eq!(store.sessions_opened(), 0);
        assert!(store.commits().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_commit_reports_partial_progress() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 300 * MIB)));
        let store = Arc::new(FakeStore::new().rejecting_commit(2));

        let failure = pipeline(&source, &store, (100 * MIB) as usize)
            .run(&request("abc123"), None)
            .await
            .unwrap_err();

        assert_eq!(failure.error.kind(), TransferErrorKind::UnexpectedCommitStatus);
        assert_eq!(failure.state, TransferState::Streaming);
        assert_eq!(failure.bytes_transferred, 100 * MIB);
        assert!(!store.statuses().contains(&CommitStatus::Complete));
        // No third read after the failed commit.
        assert_eq!(source.read_count(), 2);
    }

    #[tokio::test]
    async fn test_metadata_failures_surface_before_any_read() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 10)));
        let store = Arc::new(FakeStore::new());
        let pipeline = pipeline(&source, &store, 4);

        let failure = pipeline.run(&request("missing"), None).await.unwrap_err();
        assert_eq!(failure.error.kind(), TransferErrorKind::NotFound);
        assert_eq!(failure.state, TransferState::Init);

        let source = Arc::new(
            FakeSource::new(video_metadata("abc123", "video/mp4", 10)).denying_access(),
        );
        let failure = TransferPipeline::new(source.clone(), store.clone(), TransferOptions::default())
            .run(&request("abc123"), None)
            .await
            .unwrap_err();
        assert_eq!(failure.error.kind(), TransferErrorKind::PermissionDenied);
        assert_eq!(source.read_count(), 0);
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_offsets_are_contiguous_and_sum_to_length() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 1000)));
        let store = Arc::new(FakeStore::new());

        let receipt = pipeline(&source, &store, 256)
            .run(&request("abc123"), None)
            .await
            .unwrap();

        let commits = store.commits();
        let mut expected_offset = 0;
        for (offset, len) in &commits {
            assert_eq!(*offset, expected_offset);
            assert!(*len > 0 && *len <= 256);
            expected_offset += len;
        }
        assert_eq!(expected_offset, 1000);
        assert_eq!(receipt.bytes_transferred, 1000);
        assert_eq!(commits.len(), 4);
    }

    #[tokio::test]
    async fn test_trailing_empty_chunk_not_committed() {
        let source = Arc::new(
            FakeSource::new(video_metadata("abc123", "video/mp4", 20)).with_trailing_empty_read(),
        );
        let store = Arc::new(FakeStore::new());

        let receipt = pipeline(&source, &store, 10)
            .run(&request("abc123"), None)
            .await
            .unwrap();

        assert_eq!(source.read_count(), 3);
        assert_eq!(store.commits(), vec![(0, 10), (10, 10)]);
        assert_eq!(receipt.chunks_committed, 2);
    }

    #[tokio::test]
    async fn test_empty_object_is_finalized() {
        let source = Arc::new(FakeSource::new(video_metadata("empty", "video/mp4", 0)));
        let store = Arc::new(FakeStore::new());

        let receipt = pipeline(&source, &store, 10)
            .run(&request("empty"), None)
            .await
            .unwrap();

        assert!(store.commits().is_empty());
        assert_eq!(store.empty_finalizes(), 1);
        assert_eq!(receipt.bytes_transferred, 0);
    }

    #[tokio::test]
    async fn test_short_source_is_size_mismatch() {
        let source = Arc::new(
            FakeSource::new(video_metadata("abc123", "video/mp4", 30)).with_actual_length(20),
        );
        let store = Arc::new(FakeStore::new());

        let failure = pipeline(&source, &store, 10)
            .run(&request("abc123"), None)
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            TransferError::SizeMismatch {
                declared: 30,
                transferred: 20
            }
        ));
        assert_eq!(failure.bytes_transferred, 20);
    }

    #[tokio::test]
    async fn test_destination_never_complete() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 20)));
        let store = Arc::new(FakeStore::new().never_completing());

        let failure = pipeline(&source, &store, 10)
            .run(&request("abc123"), None)
            .await
            .unwrap_err();

        assert_eq!(failure.error.kind(), TransferErrorKind::IncompleteDestination);
        assert_eq!(failure.bytes_transferred, 20);
    }

    #[tokio::test]
    async fn test_destination_complete_too_early() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 30)));
        let store = Arc::new(FakeStore::new().completing_early_at(1));

        let failure = pipeline(&source, &store, 10)
            .run(&request("abc123"), None)
            .await
            .unwrap_err();

        assert_eq!(failure.error.kind(), TransferErrorKind::UnexpectedCommitStatus);
        assert_eq!(failure.bytes_transferred, 10);
    }

    #[tokio::test]
    async fn test_mid_stream_read_failure() {
        let source = Arc::new(
            FakeSource::new(video_metadata("abc123", "video/mp4", 30)).failing_read_at(1),
        );
        let store = Arc::new(FakeStore::new());

        let failure = pipeline(&source, &store, 10)
            .run(&request("abc123"), None)
            .await
            .unwrap_err();

        assert_eq!(failure.error.kind(), TransferErrorKind::TransferIo);
        assert!(failure.error.is_retryable());
        assert_eq!(failure.bytes_transferred, 10);
    }

    #[tokio::test]
    async fn test_explicit_destination_and_progress() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 30)));
        let store = Arc::new(FakeStore::new());
        let (tx, rx) = watch::channel(TransferProgress {
            bytes_transferred: 0,
            total_bytes: 0,
            source_progress: 0.0,
        });

        let request = TransferRequest::new("abc123", Some("/ingest/out.mp4".to_string())).unwrap();
        let receipt = pipeline(&source, &store, 10)
            .run(&request, Some(&tx))
            .await
            .unwrap();

        assert_eq!(receipt.destination_path, "ingest/out.mp4");
        let latest = *rx.borrow();
        assert_eq!(latest.bytes_transferred, 30);
        assert_eq!(latest.total_bytes, 30);
        assert_eq!(latest.source_progress, 1.0);
    }

    #[tokio::test]
    async fn test_metadata_is_idempotent() {
        let source = Arc::new(FakeSource::new(video_metadata("abc123", "video/mp4", 30)));
        let store = Arc::new(FakeStore::new());
        let pipeline = pipeline(&source, &store, 10);

        let first = pipeline.run(&request("abc123"), None).await.unwrap();
        let second = pipeline.run(&request("abc123"), None).await.unwrap();
        assert_eq!(first.file, second.file);
        assert_eq!(source.metadata_calls(), 2);
    }
}
