//! Prometheus metrics for feedwatch
//!
//! This module provides metrics tracking for:
//! - Tracking registry: tracked feeds, evictions
//! - Refresh workers: refresh outcomes, recount duration
//! - Query surface: lookup responses by status
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all feed metrics
struct FeedMetrics {
    tracked_feeds: Gauge,
    refreshes: CounterVec,
    recount_duration: Histogram,
    lookups: CounterVec,
    evictions: CounterVec,
}

/// Global storage for feed metrics, `None` when registration failed
static FEED_METRICS: OnceLock<Option<FeedMetrics>> = OnceLock::new();

fn feed_metrics() -> Option<&'static FeedMetrics> {
    FEED_METRICS.get().and_then(Option::as_ref)
}

// ============================================================================
// Initialization
// ============================================================================

fn register_feed_metrics() -> prometheus::Result<FeedMetrics> {
    Ok(FeedMetrics {
        tracked_feeds: register_gauge!(
            "feedwatch_tracked_feeds",
            "Number of feeds with an active refresh worker"
        )?,
        refreshes: register_counter_vec!(
            "feedwatch_refreshes_total",
            "Refresh attempts by outcome",
            &["outcome"]
        )?,
        recount_duration: register_histogram!(
            "feedwatch_recount_duration_seconds",
            "Time spent fetching and counting a feed archive",
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
        )?,
        lookups: register_counter_vec!(
            "feedwatch_lookups_total",
            "Feed lookups by response status",
            &["status"]
        )?,
        evictions: register_counter_vec!(
            "feedwatch_evictions_total",
            "Feeds removed from tracking by reason",
            &["reason"]
        )?,
    })
}

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// Concurrent and repeated calls register the metrics only once; if the
/// first registration failed, metric operations stay no-ops.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let mut failure = None;

    FEED_METRICS.get_or_init(|| match register_feed_metrics() {
        Ok(metrics) => {
            tracing::info!("Prometheus metrics initialized");
            Some(metrics)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus metrics registration failed");
            failure = Some(e);
            None
        }
    });

    match failure {
        Some(e) => Err(Box::new(e)),
        None => Ok(()),
    }
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    feed_metrics().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Update the tracked feeds gauge
pub fn set_tracked_feeds(count: usize) {
    if let Some(m) = feed_metrics() {
        m.tracked_feeds.set(count as f64);
    }
}

/// Record one refresh attempt
pub fn record_refresh(outcome: &str) {
    if let Some(m) = feed_metrics() {
        m.refreshes.with_label_values(&[outcome]).inc();
    }
}

/// Record a lookup response
pub fn record_lookup(status: u16) {
    if let Some(m) = feed_metrics() {
        let status_str = status.to_string();
        m.lookups.with_label_values(&[status_str.as_str()]).inc();
    }
}

/// Record a feed leaving the registry
pub fn record_eviction(reason: &str) {
    if let Some(m) = feed_metrics() {
        m.evictions.with_label_values(&[reason]).inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a recount timer
pub fn start_recount_timer() -> MetricsTimer {
    match feed_metrics() {
        Some(m) => MetricsTimer::new(m.recount_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}
