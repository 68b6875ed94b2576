//! Test helpers: build AppState and router for integration tests.
//!
//! The source is an in-memory stand-in for Drive; the destination is a real
//! `LocalStorage` rooted in a temporary directory, optionally wrapped so a
//! chosen commit is rejected.
//!
//! Run from workspace root: `cargo test -p vidrelay-api`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use vidrelay_api::setup::routes;
use vidrelay_api::state::AppState;
use vidrelay_core::models::SourceObjectMetadata;
use vidrelay_core::DestinationPathPolicy;
use vidrelay_processing::Downscaler;
use vidrelay_source::{ReadOutcome, SourceApi, SourceError, SourceResult, StreamHandle};
use vidrelay_storage::{
    BlobLocation, ByteStream, CommitStatus, LocalStorage, SessionHandle, Storage, StorageBackend,
    StorageResult,
};
use vidrelay_transfer::{TransferOptions, TransferPipeline};

pub const TEST_CONTAINER: &str = "test-bucket";
pub const TEST_CHUNK_SIZE: usize = 4;

pub struct TestApp {
    pub server: TestServer,
    pub source: Arc<InMemorySource>,
    pub storage: Arc<RejectingStorage>,
    temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Path of a stored object on disk.
    pub fn stored_path(&self, path: &str) -> PathBuf {
        self.temp_dir.path().join(TEST_CONTAINER).join(path)
    }
}

pub fn video(id: &str, name: &str, content_type: &str, bytes: &[u8]) -> (SourceObjectMetadata, Vec<u8>) {
    (
        SourceObjectMetadata {
            id: id.to_string(),
            display_name: name.to_string(),
            content_type: content_type.to_string(),
            byte_length: bytes.len() as u64,
            created_at: None,
            modified_at: None,
            canonical_view_url: Some(format!("https://drive.google.com/file/d/{}/view", id)),
            canonical_download_url: None,
            parent_container_ids: vec!["folder-1".to_string()],
        },
        bytes.to_vec(),
    )
}

/// Build the app around the given source objects. `reject_commit` makes the
/// n-th commit (1-based) come back with an unexpected status.
pub async fn setup_test_app(
    objects: Vec<(SourceObjectMetadata, Vec<u8>)>,
    reject_commit: Option<usize>,
) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let local = LocalStorage::new(temp_dir.path())
        .await
        .expect("Failed to create local storage");

    let source = Arc::new(InMemorySource::new(objects));
    let storage = Arc::new(RejectingStorage {
        inner: local,
        reject_commit,
        commits: AtomicUsize::new(0),
        sessions: AtomicUsize::new(0),
    });

    let options = TransferOptions {
        chunk_size: TEST_CHUNK_SIZE,
        expected_content_type_prefix: "video/".to_string(),
        destination_container: TEST_CONTAINER.to_string(),
        path_policy: DestinationPathPolicy::DisplayName,
    };
    let pipeline = TransferPipeline::new(source.clone(), storage.clone(), options);
    let downscaler = Downscaler::new(storage.clone(), "/nonexistent/ffmpeg", 0.5, TEST_CHUNK_SIZE)
        .expect("Failed to create downscaler");

    let state = Arc::new(AppState::new(
        pipeline,
        downscaler,
        StorageBackend::Local,
        source.source_name(),
    ));
    let app = routes::setup_routes(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        source,
        storage,
        temp_dir,
    }
}

/// In-memory Drive stand-in serving fixed objects.
pub struct InMemorySource {
    objects: HashMap<String, (SourceObjectMetadata, Vec<u8>)>,
    metadata_calls: AtomicUsize,
}

impl InMemorySource {
    fn new(objects: Vec<(SourceObjectMetadata, Vec<u8>)>) -> Self {
        Self {
            objects: objects
                .into_iter()
                .map(|(meta, bytes)| (meta.id.clone(), (meta, bytes)))
                .collect(),
            metadata_calls: AtomicUsize::new(0),
        }
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceApi for InMemorySource {
    async fn get_metadata(
        &self,
        object_id: &str,
        _include_shared_containers: bool,
    ) -> SourceResult<SourceObjectMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(object_id)
            .map(|(meta, _)| meta.clone())
            .ok_or_else(|| SourceError::NotFound(object_id.to_string()))
    }

    async fn open_media_stream(&self, object_id: &str) -> SourceResult<StreamHandle> {
        if !self.objects.contains_key(object_id) {
            return Err(SourceError::NotFound(object_id.to_string()));
        }
        Ok(StreamHandle::new(object_id))
    }

    async fn read_next(
        &self,
        handle: &mut StreamHandle,
        max_bytes: usize,
    ) -> SourceResult<ReadOutcome> {
        let (_, bytes) = self
            .objects
            .get(handle.object_id())
            .ok_or_else(|| SourceError::NotFound(handle.object_id().to_string()))?;

        let start = (handle.position() as usize).min(bytes.len());
        let end = (start + max_bytes).min(bytes.len());
        let data = Bytes::copy_from_slice(&bytes[start..end]);
        handle.record_read(data.len() as u64, Some(bytes.len() as u64));

        Ok(ReadOutcome {
            data,
            progress: handle.progress(),
            done: handle.is_done(),
        })
    }

    fn source_name(&self) -> &'static str {
        "in-memory"
    }
}

/// Local storage that can reject one commit with HTTP 503.
pub struct RejectingStorage {
    inner: LocalStorage,
    reject_commit: Option<usize>,
    commits: AtomicUsize,
    sessions: AtomicUsize,
}

impl RejectingStorage {
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for RejectingStorage {
    async fn open_resumable_session(
        &self,
        location: &BlobLocation,
        content_type: &str,
    ) -> StorageResult<SessionHandle> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        self.inner.open_resumable_session(location, content_type).await
    }

    async fn commit_range(
        &self,
        session: &SessionHandle,
        data: Bytes,
        start_offset: u64,
        total_size: u64,
    ) -> StorageResult<CommitStatus> {
        let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_commit == Some(n) {
            return Ok(CommitStatus::Rejected {
                status: 503,
                detail: "backend unavailable".to_string(),
            });
        }
        self.inner
            .commit_range(session, data, start_offset, total_size)
            .await
    }

    async fn finalize_empty(&self, session: &SessionHandle) -> StorageResult<CommitStatus> {
        self.inner.finalize_empty(session).await
    }

    async fn download_stream(&self, location: &BlobLocation) -> StorageResult<ByteStream> {
        self.inner.download_stream(location).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}
