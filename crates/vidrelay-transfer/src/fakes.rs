//! In-memory collaborators for pipeline tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vidrelay_core::models::SourceObjectMetadata;
use vidrelay_source::{ReadOutcome, SourceApi, SourceError, SourceResult, StreamHandle};
use vidrelay_storage::{
    BlobLocation, ByteStream, CommitStatus, SessionHandle, Storage, StorageBackend, StorageError,
    StorageResult,
};

pub fn video_metadata(id: &str, content_type: &str, byte_length: u64) -> SourceObjectMetadata {
    SourceObjectMetadata {
        id: id.to_string(),
        display_name: format!("{}.mp4", id),
        content_type: content_type.to_string(),
        byte_length,
        created_at: None,
        modified_at: None,
        canonical_view_url: Some(format!("https://drive.google.com/file/d/{}/view", id)),
        canonical_download_url: None,
        parent_container_ids: vec!["folder".to_string()],
    }
}

pub fn gcs_location(path: &str) -> BlobLocation {
    BlobLocation::new(StorageBackend::Gcs, "bucket", path).unwrap()
}

/// Serves zero-filled bytes up to the declared (or overridden) length; records
/// every read offset.
pub struct FakeSource {
    metadata: SourceObjectMetadata,
    actual_length: u64,
    oversized: bool,
    deny: bool,
    trailing_empty: bool,
    fail_read_at: Option<usize>,
    metadata_calls: AtomicUsize,
    reads: Mutex<Vec<u64>>,
}

impl FakeSource {
    pub fn new(metadata: SourceObjectMetadata) -> Self {
        let actual_length = metadata.byte_length;
        Self {
            metadata,
            actual_length,
            oversized: false,
            deny: false,
            trailing_empty: false,
            fail_read_at: None,
            metadata_calls: AtomicUsize::new(0),
            reads: Mutex::new(Vec::new()),
        }
    }

    /// Serve a different number of bytes than the metadata declares.
    pub fn with_actual_length(mut self, len: u64) -> Self {
        self.actual_length = len;
        self
    }

    pub fn oversized_reads(mut self) -> Self {
        self.oversized = true;
        self
    }

    pub fn denying_access(mut self) -> Self {
        self.deny = true;
        self
    }

    /// Report completion only on an extra, empty read.
    pub fn with_trailing_empty_read(mut self) -> Self {
        self.trailing_empty = true;
        self
    }

    /// Fail the read with this zero-based index.
    pub fn failing_read_at(mut self, index: usize) -> Self {
        self.fail_read_at = Some(index);
        self
    }

    pub fn metadata(&self) -> SourceObjectMetadata {
        self.metadata.clone()
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn read_offsets(&self) -> Vec<u64> {
        self.reads.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.lock().unwrap().len()
    }
}

#[async_trait]
impl SourceApi for FakeSource {
    async fn get_metadata(
        &self,
        object_id: &str,
        include_shared_containers: bool,
    ) -> SourceResult<SourceObjectMetadata> {
        assert!(include_shared_containers);
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(SourceError::PermissionDenied(object_id.to_string()));
        }
        if object_id != self.metadata.id {
            return Err(SourceError::NotFound(object_id.to_string()));
        }
        Ok(self.metadata.clone())
    }

    async fn open_media_stream(&self, object_id: &str) -> SourceResult<StreamHandle> {
        Ok(StreamHandle::new(object_id))
    }

    async fn read_next(
        &self,
        handle: &mut StreamHandle,
        max_bytes: usize,
    ) -> SourceResult<ReadOutcome> {
        let index = {
            let mut reads = self.reads.lock().unwrap();
            reads.push(handle.position());
            reads.len() - 1
        };
        if self.fail_read_at == Some(index) {
            return Err(SourceError::ReadFailed("connection reset".to_string()));
        }

        let remaining = self.actual_length - handle.position();
        let len = if self.oversized {
            max_bytes as u64 + 1
        } else {
            remaining.min(max_bytes as u64)
        };

        if self.trailing_empty {
            if len == 0 {
                handle.finish();
            } else {
                handle.record_read(len, None);
            }
        } else {
            handle.record_read(len, Some(self.actual_length));
        }

        Ok(ReadOutcome {
            data: Bytes::from(vec![0u8; len as usize]),
            progress: handle.progress(),
            done: handle.is_done(),
        })
    }

    fn source_name(&self) -> &'static str {
        "fake"
    }
}

/// Records commits; completes when a range reaches the declared total.
#[derive(Default)]
pub struct FakeStore {
    reject_commit: Option<usize>,
    complete_early_at: Option<usize>,
    never_complete: bool,
    sessions: AtomicUsize,
    empty_finalizes: AtomicUsize,
    commits: Mutex<Vec<(u64, u64)>>,
    statuses: Mutex<Vec<CommitStatus>>,
    content_types: Mutex<HashMap<String, String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the n-th (one-based) commit with an unexpected status.
    pub fn rejecting_commit(mut self, n: usize) -> Self {
        self.reject_commit = Some(n);
        self
    }

    /// Answer the n-th (one-based) commit with `Complete` regardless of offset.
    pub fn completing_early_at(mut self, n: usize) -> Self {
        self.complete_early_at = Some(n);
        self
    }

    pub fn never_completing(mut self) -> Self {
        self.never_complete = true;
        self
    }

    pub fn commits(&self) -> Vec<(u64, u64)> {
        self.commits.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<CommitStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn empty_finalizes(&self) -> usize {
        self.empty_finalizes.load(Ordering::SeqCst)
    }

    pub fn content_type_of(&self, path: &str) -> Option<String> {
        self.content_types.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl Storage for FakeStore {
    async fn open_resumable_session(
        &self,
        location: &BlobLocation,
        content_type: &str,
    ) -> StorageResult<SessionHandle> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst);
        self.content_types
            .lock()
            .unwrap()
            .insert(location.path().to_string(), content_type.to_string());
        Ok(SessionHandle::new(
            location.clone(),
            content_type,
            format!("fake-session-{}", n),
        ))
    }

    async fn commit_range(
        &self,
        _session: &SessionHandle,
        data: Bytes,
        start_offset: u64,
        total_size: u64,
    ) -> StorageResult<CommitStatus> {
        assert!(!data.is_empty(), "empty commits must never reach the store");
        let len = data.len() as u64;
        let n = {
            let mut commits = self.commits.lock().unwrap();
            commits.push((start_offset, len));
            commits.len()
        };

        let status = if self.reject_commit == Some(n) {
            CommitStatus::Rejected {
                status: 418,
                detail: "unrecognized".to_string(),
            }
        } else if self.complete_early_at == Some(n) {
            CommitStatus::Complete
        } else if !self.never_complete && start_offset + len == total_size {
            CommitStatus::Complete
        } else {
            CommitStatus::Incomplete
        };
        self.statuses.lock().unwrap().push(status.clone());
        Ok(status)
    }

    async fn finalize_empty(&self, _session: &SessionHandle) -> StorageResult<CommitStatus> {
        self.empty_finalizes.fetch_add(1, Ordering::SeqCst);
        Ok(CommitStatus::Complete)
    }

    async fn download_stream(&self, location: &BlobLocation) -> StorageResult<ByteStream> {
        Err(StorageError::NotFound(location.to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}
