//! Health and metrics endpoints
//!
//! - `GET /health` reports process status and registry occupancy as JSON
//! - `GET /metrics` exposes the Prometheus text encoding

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::metrics;
use crate::monitor::RegistryStats;

use super::AppState;

// ============================================================================
// Health Status Types
// ============================================================================

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: String,
    pub registry: RegistryStats,
}

// ============================================================================
// Health Router
// ============================================================================

/// Create the health and metrics router
pub fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check handler
///
/// Degraded while the registry is full: lookups of new feeds get 402.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.monitor.registry().stats().await;
    let status = if registry.is_full() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        registry,
    };

    (StatusCode::OK, Json(response))
}

/// Prometheus metrics handler
async fn metrics_handler() -> impl IntoResponse {
    match metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
