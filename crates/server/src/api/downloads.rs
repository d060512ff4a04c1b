//! Download monitor API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use curator_core::{ControlAction, DownloadSnapshot, MonitorView};

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

/// Serialized form of the monitor's current view.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadsResponse {
    /// `pending`, `ready`, `client_unavailable` or `unreachable`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<DownloadSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&MonitorView> for DownloadsResponse {
    fn from(view: &MonitorView) -> Self {
        Self {
            status: view.as_str(),
            snapshot: view.snapshot().map(|s| s.as_ref().clone()),
            message: match view {
                MonitorView::Unreachable { message } => Some(message.clone()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub hash: String,
    pub action: ControlAction,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/downloads
///
/// The last published view. Answers 503 `client_unavailable` when the
/// backend has no download client.
pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DownloadsResponse>> {
    let view = state.monitor().view();
    if matches!(view, MonitorView::ClientUnavailable) {
        return Err(ApiError::client_unavailable());
    }
    Ok(Json(DownloadsResponse::from(&view)))
}

/// POST /api/v1/downloads/refresh
///
/// Poll now and return the fresh view.
pub async fn refresh(State(state): State<Arc<AppState>>) -> ApiResult<Json<DownloadsResponse>> {
    state.monitor().poll().await?;
    Ok(Json(DownloadsResponse::from(&state.monitor().view())))
}

/// POST /api/v1/downloads/{hash}/{action}
///
/// Pause, resume or delete a task. The listing is not edited here; the
/// monitor picks the change up on its next refresh.
pub async fn control(
    State(state): State<Arc<AppState>>,
    Path((hash, action)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<ControlResponse>)> {
    let action: ControlAction = action.parse().map_err(ApiError::bad_request)?;
    state.dispatcher().control(&hash, action).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ControlResponse {
            hash: hash.trim().to_string(),
            action,
        }),
    ))
}
