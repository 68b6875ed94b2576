//! OpenAPI documentation, served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use vidrelay_core::models;
use vidrelay_processing::DownscaleReport;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "vidrelay API",
        description = "Copies videos from Google Drive into Google Cloud Storage in bounded chunks, and downscales stored videos with ffmpeg."
    ),
    paths(
        handlers::health::root,
        handlers::health::health_check,
        handlers::transfer::transfer,
        handlers::downscale::downscale,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::health::StatusResponse,
        handlers::health::HealthResponse,
        handlers::transfer::TransferParams,
        handlers::transfer::TransferResponse,
        handlers::transfer::TransferFailureResponse,
        handlers::transfer::MissingParameterResponse,
        handlers::downscale::DownscaleRequest,
        handlers::downscale::DownscaleResponse,
        models::SourceObjectMetadata,
        DownscaleReport,
    )),
    tags(
        (name = "health", description = "Liveness and configuration"),
        (name = "transfer", description = "Drive to storage transfers"),
        (name = "processing", description = "Video downscaling")
    )
)]
pub struct ApiDoc;
