use thiserror::Error;
use vidrelay_core::AppError;
use vidrelay_storage::StorageError;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Invalid blob URL: {0}")]
    InvalidUrl(String),

    #[error("Scale factor must be in (0, 1], got {0}")]
    InvalidScale(f64),

    #[error("Input object not found: {0}")]
    InputNotFound(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Failed to execute ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("FFmpeg failed: {0}")]
    FfmpegFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Errors caused by the request rather than the environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TranscodeError::InvalidUrl(_)
                | TranscodeError::InvalidScale(_)
                | TranscodeError::InputNotFound(_)
        )
    }
}

impl From<StorageError> for TranscodeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidLocation(msg) => TranscodeError::InvalidUrl(msg),
            StorageError::NotFound(what) => TranscodeError::InputNotFound(what),
            other => TranscodeError::Storage(other),
        }
    }
}

impl From<TranscodeError> for AppError {
    fn from(err: TranscodeError) -> Self {
        if err.is_client_error() {
            AppError::BadRequest(err.to_string())
        } else {
            match err {
                TranscodeError::Storage(e) => AppError::Storage(e.to_string()),
                other => AppError::Transcode(other.to_string()),
            }
        }
    }
}
