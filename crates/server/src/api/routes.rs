use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{
    acquisitions, downloads, handlers, middleware::metrics_middleware, search, torrents, ws,
};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Search
        .route("/search", post(search::search))
        .route("/ws/suggestions", get(ws::suggestions_ws))
        // Acquisition
        .route(
            "/acquisitions/{code}",
            get(acquisitions::get_state).delete(acquisitions::dismiss),
        )
        .route("/acquisitions/{code}/resolve", post(acquisitions::resolve))
        .route("/acquisitions/{code}/submit", post(acquisitions::submit))
        .route("/acquisitions/{code}/best", post(acquisitions::acquire_best))
        .route("/torrents/search", get(torrents::search))
        // Downloads
        .route("/downloads", get(downloads::list_downloads))
        .route("/downloads/refresh", post(downloads::refresh))
        .route("/downloads/{hash}/{action}", post(downloads::control))
        .route("/ws/downloads", get(ws::downloads_ws))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
