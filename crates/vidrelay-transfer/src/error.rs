//! Transfer error types

use crate::pipeline::TransferState;
use thiserror::Error;
use vidrelay_core::AppError;
use vidrelay_source::SourceError;
use vidrelay_storage::StorageError;

/// Discriminant of a `TransferError`, for callers deciding on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorKind {
    Validation,
    NotFound,
    PermissionDenied,
    TransferIo,
    UnexpectedCommitStatus,
    SizeMismatch,
    IncompleteDestination,
}

impl TransferErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferErrorKind::Validation => "validation",
            TransferErrorKind::NotFound => "not_found",
            TransferErrorKind::PermissionDenied => "permission_denied",
            TransferErrorKind::TransferIo => "transfer_io",
            TransferErrorKind::UnexpectedCommitStatus => "unexpected_commit_status",
            TransferErrorKind::SizeMismatch => "size_mismatch",
            TransferErrorKind::IncompleteDestination => "incomplete_destination",
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0}")]
    Validation(String),

    #[error("source object not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("transfer I/O failed: {0}")]
    TransferIo(String),

    #[error("unexpected commit status: {0}")]
    UnexpectedCommitStatus(String),

    #[error("size mismatch: source declared {declared} bytes but {transferred} were transferred")]
    SizeMismatch { declared: u64, transferred: u64 },

    #[error("destination never reported completion after {bytes_transferred} bytes")]
    IncompleteDestination { bytes_transferred: u64 },
}

impl TransferError {
    pub fn kind(&self) -> TransferErrorKind {
        match self {
            TransferError::Validation(_) => TransferErrorKind::Validation,
            TransferError::NotFound(_) => TransferErrorKind::NotFound,
            TransferError::PermissionDenied(_) => TransferErrorKind::PermissionDenied,
            TransferError::TransferIo(_) => TransferErrorKind::TransferIo,
            TransferError::UnexpectedCommitStatus(_) => TransferErrorKind::UnexpectedCommitStatus,
            TransferError::SizeMismatch { .. } => TransferErrorKind::SizeMismatch,
            TransferError::IncompleteDestination { .. } => TransferErrorKind::IncompleteDestination,
        }
    }

    /// Only transport failures are worth retrying; the pipeline itself never does.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::TransferIo(_))
    }
}

impl From<SourceError> for TransferError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(id) => TransferError::NotFound(id),
            SourceError::PermissionDenied(msg) => TransferError::PermissionDenied(msg),
            other => TransferError::TransferIo(other.to_string()),
        }
    }
}

impl From<StorageError> for TransferError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidLocation(msg) => TransferError::Validation(msg),
            other => TransferError::TransferIo(other.to_string()),
        }
    }
}

impl From<AppError> for TransferError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) | AppError::BadRequest(msg) => TransferError::Validation(msg),
            AppError::NotFound(msg) => TransferError::NotFound(msg),
            AppError::PermissionDenied(msg) => TransferError::PermissionDenied(msg),
            other => TransferError::TransferIo(other.to_string()),
        }
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Validation(msg) => AppError::Validation(msg),
            TransferError::NotFound(msg) => AppError::NotFound(msg),
            TransferError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            TransferError::TransferIo(msg) => AppError::TransferIo(msg),
            TransferError::UnexpectedCommitStatus(msg) => AppError::UnexpectedCommitStatus(msg),
            other @ (TransferError::SizeMismatch { .. }
            | TransferError::IncompleteDestination { .. }) => {
                AppError::IntegrityViolation(other.to_string())
            }
        }
    }
}

/// A failed transfer: the error, the state it failed in, and how far it got.
#[derive(Debug, Error)]
#[error("transfer failed while {state}: {error}")]
pub struct TransferFailure {
    #[source]
    pub error: TransferError,
    pub state: TransferState,
    pub bytes_transferred: u64,
}
