//! Chunked upload of a local file through a resumable session.

use crate::location::BlobLocation;
use crate::traits::{CommitStatus, Storage, StorageError, StorageResult};
use bytes::Bytes;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Upload the file at `path` to `location` in `chunk_size` pieces.
///
/// Returns the number of bytes committed. Only one chunk is held in memory
/// at a time.
pub async fn upload_from_path(
    storage: &dyn Storage,
    path: &Path,
    location: &BlobLocation,
    content_type: &str,
    chunk_size: usize,
) -> StorageResult<u64> {
    if chunk_size == 0 {
        return Err(StorageError::ConfigError(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut file = fs::File::open(path).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let total_size = file.metadata().await?.len();

    let session = storage.open_resumable_session(location, content_type).await?;

    if total_size == 0 {
        return match storage.finalize_empty(&session).await? {
            CommitStatus::Complete => Ok(0),
            other => Err(unexpected(location, 0, other)),
        };
    }

    let mut offset = 0u64;
    while offset < total_size {
        let want = (total_size - offset).min(chunk_size as u64) as usize;
        let mut buffer = vec![0u8; want];
        file.read_exact(&mut buffer).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to read {} at offset {}: {}",
                path.display(),
                offset,
                e
            ))
        })?;

        let status = storage
            .commit_range(&session, Bytes::from(buffer), offset, total_size)
            .await?;
        offset += want as u64;

        match (status, offset == total_size) {
            (CommitStatus::Incomplete, false) | (CommitStatus::Complete, true) => {}
            (other, _) => return Err(unexpected(location, offset, other)),
        }
    }

    tracing::info!(
        location = %location,
        size_bytes = total_size,
        "File upload complete"
    );

    Ok(total_size)
}

fn unexpected(location: &BlobLocation, offset: u64, status: CommitStatus) -> StorageError {
    StorageError::UploadFailed(format!(
        "Upload of {} got {:?} after {} bytes",
        location, status, offset
    ))
}
