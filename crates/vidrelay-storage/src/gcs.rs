use crate::location::BlobLocation;
use crate::traits::{
    content_range, ByteStream, CommitStatus, SessionHandle, Storage, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{header, redirect, Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// `308 Resume Incomplete`: the session accepted the range and wants more.
const RESUME_INCOMPLETE: u16 = 308;

/// GCS storage implementation over the JSON API's resumable upload protocol
#[derive(Clone)]
pub struct GcsStorage {
    http_client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl GcsStorage {
    /// Create a new GcsStorage instance
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://storage.googleapis.com`
    ///   (or an emulator endpoint such as `http://localhost:4443`)
    /// * `access_token` - OAuth bearer token; requests are unauthenticated without it
    /// * `timeout` - per-request timeout, applies to each chunk upload
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StorageError::ConfigError(
                "GCS API base URL cannot be empty".to_string(),
            ));
        }

        // 308 is a protocol status here, not a redirect.
        let http_client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(GcsStorage {
            http_client,
            base_url,
            access_token,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn ensure_gcs(location: &BlobLocation) -> StorageResult<()> {
        if location.backend() != StorageBackend::Gcs {
            return Err(StorageError::InvalidLocation(format!(
                "{} is not a GCS location",
                location
            )));
        }
        Ok(())
    }

    /// Map a commit response. `expected_persisted` is the byte count the store
    /// must acknowledge in the `Range` header of a 308.
    async fn commit_status(response: Response, expected_persisted: Option<u64>) -> CommitStatus {
        let status = response.status();
        match status.as_u16() {
            RESUME_INCOMPLETE => match expected_persisted {
                Some(expected) => {
                    let persisted = persisted_bytes(response.headers().get(header::RANGE));
                    if persisted == Some(expected) {
                        CommitStatus::Incomplete
                    } else {
                        CommitStatus::Rejected {
                            status: RESUME_INCOMPLETE,
                            detail: match persisted {
                                Some(n) => format!("store persisted {} of {} bytes", n, expected),
                                None => "store reported an unreadable Range header".to_string(),
                            },
                        }
                    }
                }
                None => CommitStatus::Incomplete,
            },
            200 | 201 => CommitStatus::Complete,
            code => CommitStatus::Rejected {
                status: code,
                detail: response.text().await.unwrap_or_default(),
            },
        }
    }
}

/// Bytes persisted according to a 308 `Range: bytes=0-N` header; no header
/// means nothing was persisted.
fn persisted_bytes(range: Option<&header::HeaderValue>) -> Option<u64> {
    let Some(value) = range else {
        return Some(0);
    };
    let last = value
        .to_str()
        .ok()?
        .trim()
        .strip_prefix("bytes=0-")?
        .parse::<u64>()
        .ok()?;
    Some(last + 1)
}

#[async_trait]
impl Storage for GcsStorage {
    async fn open_resumable_session(
        &self,
        location: &BlobLocation,
        content_type: &str,
    ) -> StorageResult<SessionHandle> {
        Self::ensure_gcs(location)?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.base_url,
            urlencoding::encode(location.container())
        );
        let response = self
            .authorize(self.http_client.post(&url))
            .query(&[("uploadType", "resumable"), ("name", location.path())])
            .header("X-Upload-Content-Type", content_type)
            .json(&serde_json::json!({
                "name": location.path(),
                "contentType": content_type,
            }))
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to open upload session: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(format!(
                "bucket {}",
                location.container()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed(format!(
                "Opening upload session for {} returned {}: {}",
                location,
                status,
                body.trim()
            )));
        }

        let session_uri = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                StorageError::BackendError(
                    "resumable session response carried no Location header".to_string(),
                )
            })?;

        tracing::debug!(
            location = %location,
            content_type = %content_type,
            "GCS resumable session opened"
        );

        Ok(SessionHandle::new(
            location.clone(),
            content_type,
            session_uri,
        ))
    }

    async fn commit_range(
        &self,
        session: &SessionHandle,
        data: Bytes,
        start_offset: u64,
        total_size: u64,
    ) -> StorageResult<CommitStatus> {
        let len = data.len() as u64;
        let range = content_range(start_offset, len, total_size)?;
        let start = std::time::Instant::now();

        let response = self
            .authorize(self.http_client.put(session.session_uri()))
            .header(header::CONTENT_RANGE, &range)
            .header(header::CONTENT_TYPE, session.content_type())
            .body(data)
            .send()
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!("Chunk upload at offset {} failed: {}", start_offset, e))
            })?;

        let status = Self::commit_status(response, Some(start_offset + len)).await;

        tracing::debug!(
            location = %session.location(),
            content_range = %range,
            size_bytes = len,
            status = ?status,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS chunk committed"
        );

        Ok(status)
    }

    async fn finalize_empty(&self, session: &SessionHandle) -> StorageResult<CommitStatus> {
        let response = self
            .authorize(self.http_client.put(session.session_uri()))
            .header(header::CONTENT_RANGE, "bytes */0")
            .body(Bytes::new())
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Empty finalize failed: {}", e)))?;

        Ok(Self::commit_status(response, None).await)
    }

    async fn download_stream(&self, location: &BlobLocation) -> StorageResult<ByteStream> {
        Self::ensure_gcs(location)?;

        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(location.container()),
            urlencoding::encode(location.path())
        );
        let response = self
            .authorize(self.http_client.get(&url))
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("Download request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(location.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::DownloadFailed(format!(
                "Download of {} returned {}: {}",
                location,
                status,
                body.trim()
            )));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| StorageError::DownloadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}
