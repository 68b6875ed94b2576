//! Downscaler - shrink a stored video by a constant factor with ffmpeg.

use futures::StreamExt;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use utoipa::ToSchema;
use vidrelay_storage::{upload_from_path, BlobLocation, Storage};

use crate::error::TranscodeError;

/// Result of a completed downscale.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DownscaleReport {
    pub input_url: String,
    pub output_url: String,
    pub scale: f64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub duration_ms: u64,
}

/// Build the ffmpeg argument list.
///
/// Output dimensions are rounded down to even numbers, which libx264 requires.
pub fn ffmpeg_args(input: &Path, output: &Path, scale: f64) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vf".to_string(),
        format!(
            "scale=trunc(iw*{scale}/2)*2:trunc(ih*{scale}/2)*2",
            scale = scale
        ),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-crf".to_string(),
        "28".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "video/mp4",
    }
}

fn validate_scale(scale: f64) -> Result<f64, TranscodeError> {
    if scale > 0.0 && scale <= 1.0 {
        Ok(scale)
    } else {
        Err(TranscodeError::InvalidScale(scale))
    }
}

pub struct Downscaler {
    storage: Arc<dyn Storage>,
    ffmpeg_path: String,
    default_scale: f64,
    upload_chunk_size: usize,
}

impl Downscaler {
    pub fn new(
        storage: Arc<dyn Storage>,
        ffmpeg_path: impl Into<String>,
        default_scale: f64,
        upload_chunk_size: usize,
    ) -> Result<Self, TranscodeError> {
        Ok(Self {
            storage,
            ffmpeg_path: ffmpeg_path.into(),
            default_scale: validate_scale(default_scale)?,
            upload_chunk_size,
        })
    }

    /// Downscale `input_url` into `output_url`; `scale` falls back to the
    /// configured factor.
    #[tracing::instrument(skip(self))]
    pub async fn downscale(
        &self,
        input_url: &str,
        output_url: &str,
        scale: Option<f64>,
    ) -> Result<DownscaleReport, TranscodeError> {
        let scale = validate_scale(scale.unwrap_or(self.default_scale))?;
        let input = self.parse_location(input_url)?;
        let output = self.parse_location(output_url)?;
        let start = Instant::now();

        // Scratch files live as long as this call.
        let scratch = tempfile::tempdir()?;
        let extension = Path::new(output.file_name())
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4")
            .to_string();
        let input_path = scratch.path().join("input");
        let output_path = scratch.path().join(format!("output.{}", extension));

        let input_bytes = self.fetch(&input, &input_path).await?;
        tracing::debug!(input = %input, size_bytes = input_bytes, "Input downloaded");

        self.run_ffmpeg(&input_path, &output_path, scale).await?;

        let output_bytes = upload_from_path(
            self.storage.as_ref(),
            &output_path,
            &output,
            content_type_for(&extension),
            self.upload_chunk_size,
        )
        .await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            input = %input,
            output = %output,
            scale,
            input_bytes,
            output_bytes,
            duration_ms,
            "Video downscaled"
        );

        Ok(DownscaleReport {
            input_url: self.storage.object_uri(&input),
            output_url: self.storage.object_uri(&output),
            scale,
            input_bytes,
            output_bytes,
            duration_ms,
        })
    }

    fn parse_location(&self, url: &str) -> Result<BlobLocation, TranscodeError> {
        if url.trim().is_empty() {
            return Err(TranscodeError::InvalidUrl(
                "input and output URLs are required".to_string(),
            ));
        }
        let location = BlobLocation::parse(url)?;
        let backend = self.storage.backend_type();
        if location.backend() != backend {
            return Err(TranscodeError::InvalidUrl(format!(
                "URL must start with {}://, got {}",
                backend.scheme(),
                url
            )));
        }
        Ok(location)
    }

    async fn fetch(&self, location: &BlobLocation, path: &Path) -> Result<u64, TranscodeError> {
        let mut stream = self.storage.download_stream(location).await?;
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn run_ffmpeg(
        &self,
        input: &Path,
        output: &Path,
        scale: f64,
    ) -> Result<(), TranscodeError> {
        let output_result = Command::new(&self.ffmpeg_path)
            .args(ffmpeg_args(input, output, scale))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(TranscodeError::Spawn)?;

        if !output_result.status.success() {
            let stderr = String::from_utf8_lossy(&output_result.stderr);
            return Err(TranscodeError::FfmpegFailed(format!(
                "{}: {}",
                output_result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
