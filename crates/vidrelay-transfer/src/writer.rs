//! Destination side of the pipeline: range commits to a resumable session.

use bytes::Bytes;
use std::sync::Arc;
use vidrelay_storage::{BlobLocation, CommitStatus, SessionHandle, Storage};

use crate::error::TransferError;

/// Commits chunks to one destination object through a resumable session.
pub struct SinkWriter {
    storage: Arc<dyn Storage>,
    session: SessionHandle,
    total_size: u64,
    committed: u64,
    chunks_committed: u64,
    complete: bool,
}

impl SinkWriter {
    /// Open a resumable session for an object of `total_size` bytes.
    pub async fn open(
        storage: Arc<dyn Storage>,
        location: &BlobLocation,
        content_type: &str,
        total_size: u64,
    ) -> Result<Self, TransferError> {
        let session = storage
            .open_resumable_session(location, content_type)
            .await?;

        Ok(Self {
            storage,
            session,
            total_size,
            committed: 0,
            chunks_committed: 0,
            complete: false,
        })
    }

    /// Commit `data` at `offset`.
    ///
    /// Empty chunks are skipped without a round trip. A status outside the
    /// protocol fails with `UnexpectedCommitStatus` and is not retried.
    pub async fn write_chunk(
        &mut self,
        data: Bytes,
        offset: u64,
    ) -> Result<CommitStatus, TransferError> {
        if data.is_empty() {
            return Ok(CommitStatus::Incomplete);
        }
        if self.complete {
            return Err(TransferError::UnexpectedCommitStatus(format!(
                "destination already complete, refusing {} more bytes at offset {}",
                data.len(),
                offset
            )));
        }
        if offset != self.committed {
            return Err(TransferError::TransferIo(format!(
                "non-contiguous commit at offset {}, expected {}",
                offset, self.committed
            )));
        }

        let len = data.len() as u64;
        let status = self
            .storage
            .commit_range(&self.session, data, offset, self.total_size)
            .await?;

        match &status {
            CommitStatus::Incomplete => {}
            CommitStatus::Complete => self.complete = true,
            CommitStatus::Rejected { status, detail } => {
                return Err(TransferError::UnexpectedCommitStatus(format!(
                    "store answered {} for range at offset {}: {}",
                    status, offset, detail
                )));
            }
        }

        self.committed += len;
        self.chunks_committed += 1;
        Ok(status)
    }

    /// Finalize a zero-byte object so it becomes visible.
    pub async fn finalize_empty(&mut self) -> Result<CommitStatus, TransferError> {
        if self.committed != 0 {
            return Err(TransferError::TransferIo(format!(
                "cannot finalize as empty after {} committed bytes",
                self.committed
            )));
        }

        match self.storage.finalize_empty(&self.session).await? {
            CommitStatus::Complete => {
                self.complete = true;
                self.chunks_committed += 1;
                Ok(CommitStatus::Complete)
            }
            other => Err(TransferError::UnexpectedCommitStatus(format!(
                "store answered {:?} to an empty finalize",
                other
            ))),
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn bytes_committed(&self) -> u64 {
        self.committed
    }

    pub fn chunks_committed(&self) -> u64 {
        self.chunks_committed
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{gcs_location, FakeStore};

    async fn writer(store: &Arc<FakeStore>, total: u64) -> SinkWriter {
        SinkWriter::open(store.clone(), &gcs_location("out.mp4"), "video/mp4", total)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_zero_length_chunk_is_skipped() {
        let store = Arc::new(FakeStore::new());
        let mut writer = writer(&store, 10).await;

        let status = writer.write_chunk(Bytes::new(), 0).await.unwrap();
        assert_eq!(status, CommitStatus::Incomplete);
        assert!(store.commits().is_empty());
        assert_eq!(writer.bytes_committed(), 0);
        assert_eq!(writer.chunks_committed(), 0);
    }

    #[tokio::test]
    async fn test_commits_until_complete() {
        let store = Arc::new(FakeStore::new());
        let mut writer = writer(&store, 10).await;

        assert_eq!(
            writer.write_chunk(Bytes::from(vec![0u8; 6]), 0).await.unwrap(),
            CommitStatus::Incomplete
        );
        assert_eq!(
            writer.write_chunk(Bytes::from(vec![0u8; 4]), 6).await.unwrap(),
            CommitStatus::Complete
        );
        assert!(writer.is_complete());
        assert_eq!(store.commits(), vec![(0, 6), (6, 4)]);
        assert_eq!(store.content_type_of("out.mp4").as_deref(), Some("video/mp4"));
    }

    #[tokio::test]
    async fn test_rejected_status_is_unexpected_commit() {
        let store = Arc::new(FakeStore::new().rejecting_commit(1));
        let mut writer = writer(&store, 10).await;

        let err = writer
            .write_chunk(Bytes::from(vec![0u8; 4]), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::UnexpectedCommitStatus(_)));
        assert!(!err.is_retryable());
        assert_eq!(writer.bytes_committed(), 0);
    }

    #[tokio::test]
    async fn test_non_contiguous_offset_refused() {
        let store = Arc::new(FakeStore::new());
        let mut writer = writer(&store, 10).await;

        assert!(writer.write_chunk(Bytes::from(vec![0u8; 4]), 2).await.is_err());
        assert!(store.commits().is_empty());
    }

    #[tokio::test]
    async fn test_finalize_empty() {
        let store = Arc::new(FakeStore::new());
        let mut writer = writer(&store, 0).await;

        assert_eq!(writer.finalize_empty().await.unwrap(), CommitStatus::Complete);
        assert!(writer.is_complete());
        assert_eq!(store.empty_finalizes(), 1);
    }
}
