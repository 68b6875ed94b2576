use crate::location::BlobLocation;
use crate::traits::{ByteStream, CommitStatus, SessionHandle, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Suffix of the staging file a session writes into before completion.
const STAGING_SUFFIX: &str = ".partial";

/// Local filesystem storage implementation
///
/// Sessions write into `{object}.partial`; the final commit renames it into
/// place, so readers never observe a half-written object.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory; `file://{container}/{path}` resolves below it
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert a location to a filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory.
    fn location_to_path(&self, location: &BlobLocation) -> StorageResult<PathBuf> {
        if location.backend() != StorageBackend::Local {
            return Err(StorageError::InvalidLocation(format!(
                "{} is not a local location",
                location
            )));
        }

        let key = format!("{}/{}", location.container(), location.path());
        if key.split('/').any(|segment| segment == "..") || key.starts_with('/') {
            return Err(StorageError::InvalidLocation(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(&key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidLocation(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        } else if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidLocation(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    fn staging_path(path: &Path) -> PathBuf {
        let mut staged = path.as_os_str().to_owned();
        staged.push(STAGING_SUFFIX);
        PathBuf::from(staged)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn staged_len(staging: &Path) -> StorageResult<u64> {
        let meta = fs::metadata(staging).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Upload session {} is not open: {}",
                staging.display(),
                e
            ))
        })?;
        Ok(meta.len())
    }

    async fn promote(&self, staging: &Path, session: &SessionHandle) -> StorageResult<()> {
        let path = self.location_to_path(session.location())?;
        fs::rename(staging, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                staging.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn open_resumable_session(
        &self,
        location: &BlobLocation,
        content_type: &str,
    ) -> StorageResult<SessionHandle> {
        let path = self.location_to_path(location)?;
        self.ensure_parent_dir(&path).await?;

        let staging = Self::staging_path(&path);
        fs::File::create(&staging).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create staging file {}: {}",
                staging.display(),
                e
            ))
        })?;

        tracing::debug!(
            location = %location,
            staging = %staging.display(),
            "Local upload session opened"
        );

        Ok(SessionHandle::new(
            location.clone(),
            content_type,
            staging.display().to_string(),
        ))
    }

    async fn commit_range(
        &self,
        session: &SessionHandle,
        data: Bytes,
        start_offset: u64,
        total_size: u64,
    ) -> StorageResult<CommitStatus> {
        // Validate the range the same way the GCS client declares it.
        crate::traits::content_range(start_offset, data.len() as u64, total_size)?;

        let staging = Self::staging_path(&self.location_to_path(session.location())?);
        let staged = Self::staged_len(&staging).await?;
        if staged != start_offset {
            return Ok(CommitStatus::Rejected {
                status: 416,
                detail: format!(
                    "session holds {} bytes but range starts at {}",
                    staged, start_offset
                ),
            });
        }

        let start = std::time::Instant::now();
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&staging)
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to open staging file {}: {}",
                    staging.display(),
                    e
                ))
            })?;
        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write staging file {}: {}",
                staging.display(),
                e
            ))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync staging file {}: {}",
                staging.display(),
                e
            ))
        })?;

        let written = start_offset + data.len() as u64;
        tracing::debug!(
            location = %session.location(),
            offset = start_offset,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local chunk committed"
        );

        if written == total_size {
            self.promote(&staging, session).await?;
            tracing::info!(
                location = %session.location(),
                size_bytes = total_size,
                "Local storage upload complete"
            );
            Ok(CommitStatus::Complete)
        } else {
            Ok(CommitStatus::Incomplete)
        }
    }

    async fn finalize_empty(&self, session: &SessionHandle) -> StorageResult<CommitStatus> {
        let staging = Self::staging_path(&self.location_to_path(session.location())?);
        let staged = Self::staged_len(&staging).await?;
        if staged != 0 {
            return Ok(CommitStatus::Rejected {
                status: 416,
                detail: format!("session already holds {} bytes", staged),
            });
        }

        self.promote(&staging, session).await?;
        Ok(CommitStatus::Complete)
    }

    async fn download_stream(&self, location: &BlobLocation) -> StorageResult<ByteStream> {
        let path = self.location_to_path(location)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(location.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let reader = tokio_util::io::ReaderStream::new(file);

        let path_display = path.display().to_string();
        let stream = reader.map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    path = %path_display,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
