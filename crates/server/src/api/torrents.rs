//! Free-text torrent search handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use curator_core::TorrentCandidate;

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TorrentSearchParams {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct TorrentSearchResponse {
    pub candidates: Vec<TorrentCandidate>,
    pub count: usize,
}

/// GET /api/v1/torrents/search?query=&page=
///
/// Candidates are ordered by size, then seeders, both descending.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TorrentSearchParams>,
) -> ApiResult<Json<TorrentSearchResponse>> {
    let candidates = state.finder().search(&params.query, params.page).await?;
    Ok(Json(TorrentSearchResponse {
        count: candidates.len(),
        candidates,
    }))
}
