//! Liveness and health handlers.

use crate::constants::API_VERSION;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub source: String,
    pub storage_backend: String,
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Service is running", body = StatusResponse))
)]
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service configuration summary", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: API_VERSION.to_string(),
        source: state.source_name.to_string(),
        storage_backend: state.storage_backend.to_string(),
    })
}
