//! Acquisition API handlers.
//!
//! Resolve an identifier to torrent candidates, submit one of them (or let
//! the desk pick the best), or dismiss the candidate list.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use curator_core::{AcquisitionRequest, AcquisitionState, ResolveOutcome};

use super::error::ApiResult;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Index into the resolved candidate list.
    pub candidate_index: usize,
}

#[derive(Debug, Serialize)]
pub struct AcquisitionStateResponse {
    pub identifier: String,
    #[serde(flatten)]
    pub state: AcquisitionState,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/acquisitions/{code}
pub async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<AcquisitionStateResponse> {
    let identifier = code.trim().to_string();
    let current = state.desk().state(&identifier);
    Json(AcquisitionStateResponse {
        identifier,
        state: current,
    })
}

/// POST /api/v1/acquisitions/{code}/resolve
///
/// Look the identifier up on the torrent index. An identifier the backend
/// already holds resolves to `already_exists` rather than an error.
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<ResolveOutcome>> {
    let outcome = state.desk().resolve(&code).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/acquisitions/{code}/submit
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<AcquisitionRequest>)> {
    let submitted = state
        .desk()
        .submit_index(&code, request.candidate_index)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(submitted)))
}

/// POST /api/v1/acquisitions/{code}/best
///
/// Resolve and submit the largest candidate without showing a list.
pub async fn acquire_best(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<(StatusCode, Json<AcquisitionRequest>)> {
    let submitted = state.desk().acquire_best(&code).await?;
    Ok((StatusCode::ACCEPTED, Json(submitted)))
}

/// DELETE /api/v1/acquisitions/{code}
///
/// Dismiss the candidate list; the identifier returns to idle.
pub async fn dismiss(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> StatusCode {
    state.desk().dismiss(&code);
    StatusCode::NO_CONTENT
}
