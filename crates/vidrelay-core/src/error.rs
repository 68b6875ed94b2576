//! Error types module
//!
//! `AppError` unifies the failures of every component (source, storage,
//! transfer pipeline, transcode) into one enum whose variants self-describe
//! their HTTP status, machine-readable code and retry guidance.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for inaccessible inputs the caller can fix
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TRANSFER_IO_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (a caller may retry)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Transfer I/O error: {0}")]
    TransferIo(String),

    #[error("Unexpected commit status: {0}")]
    UnexpectedCommitStatus(String),

    #[error("Transfer integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check the input file type and request parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file ID exists and is shared with the service account"),
            false,
            LogLevel::Warn,
        ),
        AppError::PermissionDenied(_) => (
            403,
            "PERMISSION_DENIED",
            false,
            Some("Grant the service access to the file or its shared drive"),
            false,
            LogLevel::Warn,
        ),
        AppError::TransferIo(_) => (
            502,
            "TRANSFER_IO_ERROR",
            true,
            Some("Retry the transfer after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::UnexpectedCommitStatus(_) => (
            502,
            "UNEXPECTED_COMMIT_STATUS",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::IntegrityViolation(_) => (
            500,
            "TRANSFER_INTEGRITY_ERROR",
            false,
            Some("Verify the source file was not modified during the transfer"),
            false,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Transcode(_) => (
            500,
            "TRANSCODE_ERROR",
            false,
            Some("Check that the input is a playable video file"),
            false,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::BadRequest(_) => "BadRequest",
            AppError::Validation(_) => "Validation",
            AppError::NotFound(_) => "NotFound",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::TransferIo(_) => "TransferIo",
            AppError::UnexpectedCommitStatus(_) => "UnexpectedCommitStatus",
            AppError::IntegrityViolation(_) => "IntegrityViolation",
            AppError::Storage(_) => "Storage",
            AppError::Transcode(_) => "Transcode",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PermissionDenied(ref msg) => msg.clone(),
            AppError::TransferIo(_) => "Failed to move data between source and storage".to_string(),
            AppError::UnexpectedCommitStatus(_) => {
                "Destination storage rejected the upload".to_string()
            }
            AppError::IntegrityViolation(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Transcode(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::Validation("Invalid mime type: application/pdf".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Invalid mime type: application/pdf");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_transfer_io() {
        let err = AppError::TransferIo("connection reset".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "TRANSFER_IO_ERROR");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("connection reset"));
    }

    #[test]
    fn test_unexpected_commit_status_is_not_recoverable() {
        let err = AppError::UnexpectedCommitStatus("HTTP 503".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("inner cause").context("outer context"));
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("outer context"));
    }

    #[test]
    fn test_error_metadata_suggested_actions() {
        let err1 = AppError::Storage("test".to_string());
        assert_eq!(err1.suggested_action(), Some("Retry after a short delay"));

        let err2 = AppError::BadRequest("test".to_string());
        assert_eq!(
            err2.suggested_action(),
            Some("Check request format and parameters")
        );
    }
}
