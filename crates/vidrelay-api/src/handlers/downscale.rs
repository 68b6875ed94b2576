//! Downscale a stored video with ffmpeg.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use vidrelay_processing::DownscaleReport;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DownscaleRequest {
    /// Blob URL of the input video, e.g. `gs://bucket/in.mp4`.
    pub gcs_input_url: String,
    /// Blob URL to write the downscaled video to.
    pub gcs_output_url: String,
    /// Factor in (0, 1]; the configured default when absent.
    #[serde(default)]
    pub scale: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownscaleResponse {
    pub status: String,
    pub output_url: String,
    pub report: DownscaleReport,
}

#[utoipa::path(
    post,
    path = "/downscale",
    tag = "processing",
    request_body = DownscaleRequest,
    responses(
        (status = 200, description = "Video downscaled", body = DownscaleResponse),
        (status = 400, description = "Invalid URL, scale or missing input", body = ErrorResponse),
        (status = 500, description = "Encoding or storage failure", body = ErrorResponse)
    )
)]
pub async fn downscale(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DownscaleRequest>,
) -> Result<Json<DownscaleResponse>, HttpAppError> {
    let report = state
        .downscaler
        .downscale(&request.gcs_input_url, &request.gcs_output_url, request.scale)
        .await?;

    Ok(Json(DownscaleResponse {
        status: "success".to_string(),
        output_url: report.output_url.clone(),
        report,
    }))
}
