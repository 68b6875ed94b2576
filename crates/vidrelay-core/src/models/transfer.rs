use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::SourceObjectMetadata;
use crate::config::DestinationPathPolicy;
use crate::error::AppError;

/// An accepted request to copy one source object into blob storage.
///
/// Construction validates the identifier and the optional destination path;
/// the value is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    source_object_id: String,
    destination_path: Option<String>,
}

impl TransferRequest {
    pub fn new(
        source_object_id: impl Into<String>,
        destination_path: Option<String>,
    ) -> Result<Self, AppError> {
        let source_object_id = source_object_id.into().trim().to_string();
        if source_object_id.is_empty() {
            return Err(AppError::Validation(
                "source object id cannot be empty".to_string(),
            ));
        }

        let destination_path = match destination_path {
            Some(path) if !path.trim().is_empty() => Some(normalize_destination_path(&path)?),
            _ => None,
        };

        Ok(Self {
            source_object_id,
            destination_path,
        })
    }

    pub fn source_object_id(&self) -> &str {
        &self.source_object_id
    }

    pub fn destination_path(&self) -> Option<&str> {
        self.destination_path.as_deref()
    }

    /// The explicit destination path, or one derived from the source display
    /// name under the configured policy.
    pub fn resolve_destination_path(
        &self,
        metadata: &SourceObjectMetadata,
        policy: &DestinationPathPolicy,
    ) -> Result<String, AppError> {
        match &self.destination_path {
            Some(path) => Ok(path.clone()),
            None => {
                let display_name = metadata.display_name.trim();
                if display_name.is_empty() {
                    return Err(AppError::Validation(format!(
                        "source object {} has no name to derive a destination path from",
                        metadata.id
                    )));
                }
                normalize_destination_path(&policy.derive(display_name))
            }
        }
    }
}

/// Strip leading slashes and reject traversal segments.
pub fn normalize_destination_path(path: &str) -> Result<String, AppError> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "destination path cannot be empty".to_string(),
        ));
    }
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(AppError::Validation(format!(
            "destination path must not contain '..': {}",
            path
        )));
    }
    Ok(trimmed.to_string())
}

/// Receipt of a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransferReceipt {
    pub destination_uri: String,
    pub destination_path: String,
    pub bytes_transferred: u64,
    pub chunks_committed: u64,
    pub file: SourceObjectMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str) -> SourceObjectMetadata {
        SourceObjectMetadata {
            id: "abc123".to_string(),
            display_name: name.to_string(),
            content_type: "video/mp4".to_string(),
            byte_length: 10,
            created_at: None,
            modified_at: None,
            canonical_view_url: None,
            canonical_download_url: None,
            parent_container_ids: Vec::new(),
        }
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(matches!(
            TransferRequest::new("   ", None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_destination_treated_as_absent() {
        let request = TransferRequest::new("abc123", Some(" ".to_string())).unwrap();
        assert_eq!(request.destination_path(), None);
    }

    #[test]
    fn test_explicit_destination_wins() {
        let request = TransferRequest::new("abc123", Some("/videos/out.mp4".to_string())).unwrap();
        let path = request
            .resolve_destination_path(
                &metadata("clip.mp4"),
                &DestinationPathPolicy::Prefixed("ingest".to_string()),
            )
            .unwrap();
        assert_eq!(path, "videos/out.mp4");
    }

    #[test]
    fn test_destination_derived_from_display_name() {
        let request = TransferRequest::new("abc123", None).unwrap();
        let plain = request
            .resolve_destination_path(&metadata("clip.mp4"), &DestinationPathPolicy::DisplayName)
            .unwrap();
        assert_eq!(plain, "clip.mp4");

        let prefixed = request
            .resolve_destination_path(
                &metadata("clip.mp4"),
                &DestinationPathPolicy::Prefixed("ingest".to_string()),
            )
            .unwrap();
        assert_eq!(prefixed, "ingest/clip.mp4");
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(TransferRequest::new("abc123", Some("../etc/passwd".to_string())).is_err());
        let request = TransferRequest::new("abc123", None).unwrap();
        assert!(request
            .resolve_destination_path(&metadata(".."), &DestinationPathPolicy::DisplayName)
            .is_err());
    }

    #[test]
    fn test_nameless_source_cannot_derive_path() {
        let request = TransferRequest::new("abc123", None).unwrap();
        assert!(matches!(
            request.resolve_destination_path(&metadata(""), &DestinationPathPolicy::DisplayName),
            Err(AppError::Validation(_))
        ));
    }
}
