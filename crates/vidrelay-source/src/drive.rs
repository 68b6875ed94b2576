//! Google Drive v3 source implementation

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use vidrelay_core::models::SourceObjectMetadata;

use crate::traits::{ReadOutcome, SourceApi, SourceError, SourceResult, StreamHandle};

/// Fields requested by the single metadata lookup.
const METADATA_FIELDS: &str =
    "id,name,mimeType,size,createdTime,modifiedTime,webViewLink,webContentLink,parents";

/// Drive v3 file resource. `size` arrives as a decimal string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    size: Option<String>,
    created_time: Option<DateTime<Utc>>,
    modified_time: Option<DateTime<Utc>>,
    web_view_link: Option<String>,
    web_content_link: Option<String>,
    #[serde(default)]
    parents: Vec<String>,
}

impl DriveFile {
    fn into_metadata(self) -> SourceResult<SourceObjectMetadata> {
        let byte_length = match self.size.as_deref() {
            Some(size) => size.trim().parse::<u64>().map_err(|_| {
                SourceError::InvalidResponse(format!(
                    "non-numeric size {:?} for file {}",
                    size, self.id
                ))
            })?,
            None => 0,
        };

        Ok(SourceObjectMetadata {
            id: self.id,
            display_name: self.name,
            content_type: self.mime_type,
            byte_length,
            created_at: self.created_time,
            modified_at: self.modified_time,
            canonical_view_url: self.web_view_link,
            canonical_download_url: self.web_content_link,
            parent_container_ids: self.parents,
        })
    }
}

/// Drive v3 client reading file metadata and media over HTTP.
pub struct DriveClient {
    http_client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl DriveClient {
    /// Create a new Drive client
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://www.googleapis.com/drive/v3`
    /// * `access_token` - OAuth bearer token; requests are unauthenticated without it
    /// * `timeout` - per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> SourceResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SourceError::ConfigError(
                "Drive API base URL cannot be empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            access_token,
        })
    }

    fn file_url(&self, object_id: &str) -> String {
        format!("{}/files/{}", self.base_url, urlencoding::encode(object_id))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn status_error(response: Response, object_id: &str) -> SourceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => SourceError::NotFound(object_id.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SourceError::PermissionDenied(format!("{}: {}", object_id, body.trim()))
            }
            _ => SourceError::ReadFailed(format!(
                "Drive returned {} for {}: {}",
                status,
                object_id,
                body.trim()
            )),
        }
    }
}

/// Parse `bytes <first>-<last>/<total>`; total may be `*`.
fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let rest = value.trim().strip_prefix("bytes ")?;
    let (range, total) = rest.split_once('/')?;
    let (first, last) = range.split_once('-')?;
    let first = first.trim().parse().ok()?;
    let last = last.trim().parse().ok()?;
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    if last < first {
        return None;
    }
    Some((first, last, total))
}

/// Buffer a response body, failing once it exceeds `limit` bytes.
async fn read_body_bounded(mut response: Response, limit: usize) -> SourceResult<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| SourceError::ReadFailed(format!("Failed to read media body: {}", e)))?
    {
        if buffer.len() + chunk.len() > limit {
            return Err(SourceError::InvalidResponse(format!(
                "media body exceeds the requested {} bytes",
                limit
            )));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

#[async_trait]
impl SourceApi for DriveClient {
    #[tracing::instrument(skip(self))]
    async fn get_metadata(
        &self,
        object_id: &str,
        include_shared_containers: bool,
    ) -> SourceResult<SourceObjectMetadata> {
        let mut query = vec![("fields", METADATA_FIELDS)];
        if include_shared_containers {
            query.push(("supportsAllDrives", "true"));
        }

        let response = self
            .authorize(self.http_client.get(self.file_url(object_id)))
            .query(&query)
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(format!("Metadata request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response, object_id).await);
        }

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(format!("Malformed file resource: {}", e)))?;

        let metadata = file.into_metadata()?;
        tracing::debug!(
            file_id = %metadata.id,
            mime_type = %metadata.content_type,
            size = metadata.byte_length,
            "Fetched Drive file metadata"
        );
        Ok(metadata)
    }

    async fn open_media_stream(&self, object_id: &str) -> SourceResult<StreamHandle> {
        if object_id.trim().is_empty() {
            return Err(SourceError::NotFound(object_id.to_string()));
        }
        Ok(StreamHandle::new(object_id))
    }

    async fn read_next(
        &self,
        handle: &mut StreamHandle,
        max_bytes: usize,
    ) -> SourceResult<ReadOutcome> {
        if max_bytes == 0 {
            return Err(SourceError::ConfigError(
                "read size must be greater than zero".to_string(),
            ));
        }
        if handle.is_done() {
            return Ok(ReadOutcome {
                data: Bytes::new(),
                progress: handle.progress(),
                done: true,
            });
        }

        let start = handle.position();
        let mut end = start + max_bytes as u64 - 1;
        if let Some(total) = handle.total_size() {
            end = end.min(total.saturating_sub(1));
        }

        let response = self
            .authorize(self.http_client.get(self.file_url(handle.object_id())))
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .header(header::RANGE, format!("bytes={}-{}", start, end))
            .send()
            .await
            .map_err(|e| SourceError::ReadFailed(format!("Media request failed: {}", e)))?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {
                let content_range = response
                    .headers()
                    .get(header::CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range)
                    .ok_or_else(|| {
                        SourceError::InvalidResponse(
                            "partial response without a valid Content-Range".to_string(),
                        )
                    })?;
                let (first, last, total) = content_range;
                if first != start {
                    return Err(SourceError::InvalidResponse(format!(
                        "requested range starting at {} but received {}",
                        start, first
                    )));
                }

                let data = read_body_bounded(response, max_bytes).await?;
                if data.len() as u64 != last - first + 1 {
                    return Err(SourceError::ReadFailed(format!(
                        "expected {} bytes at offset {} but received {}",
                        last - first + 1,
                        first,
                        data.len()
                    )));
                }

                handle.record_read(data.len() as u64, total);
                tracing::trace!(
                    file_id = %handle.object_id(),
                    offset = first,
                    len = data.len(),
                    "Read media range"
                );
                Ok(ReadOutcome {
                    data,
                    progress: handle.progress(),
                    done: handle.is_done(),
                })
            }
            StatusCode::OK => {
                // Range ignored: the body is the whole object.
                if start != 0 {
                    return Err(SourceError::InvalidResponse(format!(
                        "range request at offset {} answered with the full object",
                        start
                    )));
                }
                let data = read_body_bounded(response, max_bytes).await?;
                handle.record_read(data.len() as u64, None);
                handle.finish();
                Ok(ReadOutcome {
                    data,
                    progress: handle.progress(),
                    done: true,
                })
            }
            StatusCode::RANGE_NOT_SATISFIABLE => {
                // Empty objects and reads at end-of-object land here.
                handle.finish();
                Ok(ReadOutcome {
                    data: Bytes::new(),
                    progress: handle.progress(),
                    done: true,
                })
            }
            _ => Err(Self::status_error(response, handle.object_id()).await),
        }
    }

    fn source_name(&self) -> &'static str {
        "google-drive"
    }
}
