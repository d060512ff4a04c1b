//! Prometheus metrics for observability.
//!
//! This module provides the server-side metrics:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Monitor status (collected dynamically)
//!
//! Search, acquisition and monitor counters live in `curator_core::metrics`
//! and are registered here as well.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "curator_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "curator_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections by channel.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "curator_ws_connections_active",
            "Number of active WebSocket connections",
        ),
        &["channel"],
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative) by channel.
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_ws_connections_total",
            "Total WebSocket connections since startup",
        ),
        &["channel"],
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

// =============================================================================
// Monitor Metrics
// =============================================================================

/// Whether the download monitor interval is running (1) or not (0).
pub static MONITOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "curator_monitor_running",
        "Whether the download monitor is running",
    )
    .unwrap()
});

/// Current monitor view by state (1 for the active state, 0 otherwise).
pub static MONITOR_VIEW: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("curator_monitor_view", "Current download monitor view"),
        &["view"],
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();

    // Monitor
    registry
        .register(Box::new(MONITOR_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(MONITOR_VIEW.clone())).unwrap();

    // Core metrics (search, acquisition, monitor)
    for metric in curator_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the monitor as of the scrape.
pub fn collect_dynamic_metrics(state: &AppState) {
    let monitor = state.monitor();
    MONITOR_RUNNING.set(if monitor.is_running() { 1 } else { 0 });

    let current = monitor.view();
    for view in ["pending", "ready", "client_unavailable", "unreachable"] {
        MONITOR_VIEW
            .with_label_values(&[view])
            .set(if current.as_str() == view { 1 } else { 0 });
    }
}

static HASH_RE: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/[0-9a-fA-F]{32,40}(/|$)").unwrap());
static CODE_RE: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"(/acquisitions)/[^/]+").unwrap());

/// Normalize a path for metric labels (replace hashes and identifiers with
/// placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = HASH_RE.replace_all(path, "/{hash}$1");
    let result = CODE_RE.replace_all(&result, "$1/{code}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_hash() {
        let path = "/api/v1/downloads/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3/pause";
        assert_eq!(normalize_path(path), "/api/v1/downloads/{hash}/pause");
    }

    #[test]
    fn test_normalize_path_acquisition_code() {
        assert_eq!(
            normalize_path("/api/v1/acquisitions/ABC-123/resolve"),
            "/api/v1/acquisitions/{code}/resolve"
        );
        assert_eq!(
            normalize_path("/api/v1/acquisitions/ABC-123"),
            "/api/v1/acquisitions/{code}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("curator_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        curator_core::metrics::SEARCHES_TOTAL
            .with_label_values(&["ok"])
            .inc_by(0);
        curator_core::metrics::TASKS_OWNED.set(0);
        MONITOR_RUNNING.set(0);

        let output = encode_metrics();
        assert!(output.contains("curator_searches_total"));
        assert!(output.contains("curator_tasks_owned"));
        assert!(output.contains("curator_monitor_running"));
    }
}
