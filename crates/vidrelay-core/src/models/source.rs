use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Descriptive metadata of a source object, fetched once per transfer.
///
/// Serialized with the source API's field names so the transfer receipt
/// preserves them as the client knows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SourceObjectMetadata {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "mimeType")]
    pub content_type: String,
    #[serde(rename = "size")]
    pub byte_length: u64,
    #[serde(rename = "createdTime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "modifiedTime")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(rename = "webViewLink")]
    pub canonical_view_url: Option<String>,
    #[serde(rename = "webContentLink")]
    pub canonical_download_url: Option<String>,
    #[serde(rename = "parents", default)]
    pub parent_container_ids: Vec<String>,
}

impl SourceObjectMetadata {
    /// Whether the declared content type belongs to the given media class
    /// (e.g. `video/`).
    pub fn has_content_type_prefix(&self, prefix: &str) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .starts_with(&prefix.to_ascii_lowercase())
    }
}
