//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Upstream host requests
//! - Listing cache lookups (hit, miss, coalesced)
//! - Subtitle pipeline runs and per-candidate tasks

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Upstream Metrics
// =============================================================================

/// Upstream requests by endpoint and result.
pub static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "captionrelay_upstream_requests_total",
            "Total requests sent to the upstream content host",
        ),
        &["endpoint", "result"], // endpoint: "files", "links", "xref"; result: "success", "error"
    )
    .unwrap()
});

/// Upstream request duration in seconds.
pub static UPSTREAM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "captionrelay_upstream_request_duration_seconds",
            "Duration of upstream content host requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

/// Cache lookups by cache name and outcome.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("captionrelay_cache_lookups_total", "Total cache lookups"),
        &["cache", "outcome"], // outcome: "hit", "miss", "coalesced"
    )
    .unwrap()
});

// =============================================================================
// Subtitle Pipeline Metrics
// =============================================================================

/// Pipeline runs by outcome.
pub static SUBTITLE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "captionrelay_subtitle_runs_total",
            "Total subtitle pipeline runs",
        ),
        &["outcome"], // "local", "fetched", "not_found", "failed", "invalid"
    )
    .unwrap()
});

/// Candidate fetch/convert tasks by outcome.
pub static SUBTITLE_TASKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "captionrelay_subtitle_tasks_total",
            "Total subtitle candidate tasks",
        ),
        &["outcome"], // "success" or the failure kind
    )
    .unwrap()
});

/// Pipeline run duration in seconds (network path only).
pub static SUBTITLE_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "captionrelay_subtitle_fetch_duration_seconds",
            "Duration of subtitle acquisition on cache miss",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Upstream
        Box::new(UPSTREAM_REQUESTS.clone()),
        Box::new(UPSTREAM_DURATION.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        // Subtitles
        Box::new(SUBTITLE_RUNS.clone()),
        Box::new(SUBTITLE_TASKS.clone()),
        Box::new(SUBTITLE_FETCH_DURATION.clone()),
    ]
}
