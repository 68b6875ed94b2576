//! Copy one source object into blob storage.
//!
//! Parameters come from a JSON body when one is present and names a file,
//! otherwise from the query string.

use crate::constants::TRANSFER_USAGE;
use crate::error::{is_production_env, log_error};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use utoipa::{IntoParams, ToSchema};
use vidrelay_core::models::{SourceObjectMetadata, TransferReceipt, TransferRequest};
use vidrelay_core::{AppError, ErrorMetadata};
use vidrelay_transfer::{
    TransferError, TransferErrorKind, TransferFailure, TransferProgress, TransferState,
};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransferParams {
    /// Source file identifier.
    pub file_id: Option<String>,
    /// Destination object path; derived from the file name when absent.
    pub gcs_destination_path: Option<String>,
}

impl TransferParams {
    fn has_file_id(&self) -> bool {
        self.file_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MissingParameterResponse {
    pub error: String,
    pub usage: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    pub success: bool,
    pub gcs_uri: String,
    pub gcs_path: String,
    pub bytes_transferred: u64,
    pub chunks_committed: u64,
    pub file: SourceObjectMetadata,
}

impl From<TransferReceipt> for TransferResponse {
    fn from(receipt: TransferReceipt) -> Self {
        Self {
            success: true,
            gcs_uri: receipt.destination_uri,
            gcs_path: receipt.destination_path,
            bytes_transferred: receipt.bytes_transferred,
            chunks_committed: receipt.chunks_committed,
            file: receipt.file,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferFailureResponse {
    pub success: bool,
    /// Failure kind, e.g. `validation` or `unexpected_commit_status`.
    pub error: String,
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    pub recoverable: bool,
    /// Pipeline state the transfer failed in.
    pub state: String,
    /// Bytes the destination acknowledged before the failure.
    pub bytes_transferred: u64,
    /// Fraction of the source read at the last committed chunk.
    pub source_progress: f64,
}

/// Pick the parameter set: the JSON body when it names a file, else the query.
fn select_params(body: &[u8], query: TransferParams) -> Option<TransferParams> {
    let from_body = serde_json::from_slice::<TransferParams>(body)
        .ok()
        .filter(TransferParams::has_file_id);

    from_body.or_else(|| Some(query).filter(TransferParams::has_file_id))
}

fn failure_response(failure: TransferFailure, source_progress: f64) -> Response {
    let kind = failure.error.kind();
    let status = match kind {
        TransferErrorKind::Validation => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = failure.error.to_string();
    let app_error = AppError::from(failure.error);
    log_error(&app_error);

    let message = if is_production_env() && app_error.is_sensitive() {
        app_error.client_message()
    } else {
        message
    };

    let body = TransferFailureResponse {
        success: false,
        error: kind.as_str().to_string(),
        message,
        code: app_error.error_code().to_string(),
        recoverable: app_error.is_recoverable(),
        state: failure.state.to_string(),
        bytes_transferred: failure.bytes_transferred,
        source_progress,
    };

    (status, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/transfer",
    tag = "transfer",
    params(TransferParams),
    request_body(content = TransferParams, content_type = "application/json"),
    responses(
        (status = 200, description = "Object copied", body = TransferResponse),
        (status = 400, description = "Missing identifier, or request or source object rejected", body = TransferFailureResponse),
        (status = 500, description = "Transfer failed", body = TransferFailureResponse)
    )
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TransferParams>, QueryRejection>,
    body: Bytes,
) -> Response {
    let query = query.map(|Query(params)| params).unwrap_or_default();

    let Some(params) = select_params(&body, query) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(MissingParameterResponse {
                error: "Missing file_id parameter".to_string(),
                usage: TRANSFER_USAGE.to_string(),
            }),
        )
            .into_response();
    };

    let request = match TransferRequest::new(
        params.file_id.unwrap_or_default(),
        params.gcs_destination_path,
    ) {
        Ok(request) => request,
        Err(err) => {
            return failure_response(
                TransferFailure {
                    error: TransferError::from(err),
                    state: TransferState::Init,
                    bytes_transferred: 0,
                },
                0.0,
            )
        }
    };

    tracing::info!(
        object_id = %request.source_object_id(),
        destination_path = ?request.destination_path(),
        "Transfer requested"
    );

    let (progress_tx, progress_rx) = watch::channel(TransferProgress {
        bytes_transferred: 0,
        total_bytes: 0,
        source_progress: 0.0,
    });

    match state.pipeline.run(&request, Some(&progress_tx)).await {
        Ok(receipt) => (StatusCode::OK, Json(TransferResponse::from(receipt))).into_response(),
        Err(failure) => {
            let last = *progress_rx.borrow();
            tracing::warn!(
                bytes_transferred = last.bytes_transferred,
                total_bytes = last.total_bytes,
                progress_percent = (last.source_progress * 100.0).round(),
                "Transfer stopped before completion"
            );
            failure_response(failure, last.source_progress)
        }
    }
}
