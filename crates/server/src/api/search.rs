//! Multi-source search API handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::debug;

use curator_core::{search::ProviderHint, AggregatedResultSet, SearchQuery, SourceFlags};

use super::error::ApiResult;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Sources to query; all of them when omitted.
    #[serde(default)]
    pub sources: Option<SourceFlags>,
    /// Metadata-provider hint; the provider decides when omitted.
    #[serde(default)]
    pub hint: Option<ProviderHint>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/search
///
/// Fan a query out to the local library, the rankings and the metadata
/// provider and return the merged result set.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<AggregatedResultSet>> {
    let flags = request.sources.unwrap_or_else(SourceFlags::all);
    let hint = request.hint.unwrap_or_default();
    debug!(
        query = %request.query,
        ?flags,
        ?hint,
        detected = ?ProviderHint::detect(&request.query),
        "Search request"
    );

    let query = SearchQuery::new(request.query, flags).with_hint(hint);
    let set = state.coordinator().search(&query).await?;
    Ok(Json(set))
}
