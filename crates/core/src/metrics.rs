//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Search fan-out (outcomes, per-source failures, duration)
//! - Suggestions
//! - Acquisition (resolve and submit)
//! - Download monitor and control actions

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Search Metrics
// =============================================================================

/// Searches total by outcome.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_searches_total", "Total fan-out searches"),
        &["outcome"], // "ok", "empty", "busy", "superseded", "request_failed", ...
    )
    .unwrap()
});

/// Source failures by source.
pub static SOURCE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_source_failures_total",
            "Total search source failures",
        ),
        &["source"],
    )
    .unwrap()
});

/// Search duration in seconds.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "curator_search_duration_seconds",
            "Duration of a fan-out search",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Suggestion requests by outcome.
pub static SUGGESTION_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_suggestion_requests_total",
            "Total suggestion requests issued",
        ),
        &["outcome"], // "shown", "empty", "stale", "failed"
    )
    .unwrap()
});

// =============================================================================
// Acquisition Metrics
// =============================================================================

/// Resolve calls by outcome.
pub static RESOLVES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_resolves_total", "Total candidate resolves"),
        &["outcome"], // "candidates_ready", "already_exists", "no_candidates", "failed"
    )
    .unwrap()
});

/// Submissions by outcome.
pub static SUBMITS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_submits_total", "Total acquisition submissions"),
        &["outcome"], // "submitted", "already_exists", "failed"
    )
    .unwrap()
});

// =============================================================================
// Monitor Metrics
// =============================================================================

/// Monitor polls by outcome.
pub static MONITOR_POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_monitor_polls_total", "Total download status polls"),
        &["outcome"], // "ok", "client_unavailable", "failed"
    )
    .unwrap()
});

/// Tasks carrying the ownership tag in the latest snapshot.
pub static TASKS_OWNED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "curator_tasks_owned",
        "Download tasks carrying the ownership tag",
    )
    .unwrap()
});

/// Control actions by action and result.
pub static CONTROL_ACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_control_actions_total", "Total control actions"),
        &["action", "result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Search
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SOURCE_FAILURES.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(SUGGESTION_REQUESTS.clone()),
        // Acquisition
        Box::new(RESOLVES_TOTAL.clone()),
        Box::new(SUBMITS_TOTAL.clone()),
        // Monitor
        Box::new(MONITOR_POLLS.clone()),
        Box::new(TASKS_OWNED.clone()),
        Box::new(CONTROL_ACTIONS.clone()),
    ]
}
