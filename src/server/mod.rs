//! HTTP server for feedwatch
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │          FeedWatch Server           │
//! │                                     │
//! │  ┌───────────────────────────────┐  │
//! │  │        REST API               │  │
//! │  │  GET  /feedinfo?url=          │  │
//! │  │  GET  /feeds                  │  │
//! │  │  GET  /health                 │  │
//! │  │  GET  /metrics                │  │
//! │  └──────────────┬────────────────┘  │
//! │                 │                   │
//! │  ┌──────────────▼────────────────┐  │
//! │  │        FeedMonitor            │  │
//! │  │  - Tracking registry          │  │
//! │  │  - Refresh workers            │  │
//! │  │  - Feed state store           │  │
//! │  └───────────────────────────────┘  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use feedwatch::config::Config;
//! use feedwatch::server::FeedWatchServer;
//!
//! let server = FeedWatchServer::new(Config::default())?;
//! server.start_with_shutdown(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

pub mod api;
pub mod health;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::monitor::FeedMonitor;
use crate::utils::format_window;

pub use api::{create_router, render_lookup, STALE_MESSAGE};
pub use health::create_health_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Feed monitor
    pub monitor: Arc<FeedMonitor>,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: Config,
}

// ============================================================================
// FeedWatch Server
// ============================================================================

/// Main feedwatch server
pub struct FeedWatchServer {
    config: Config,
    state: AppState,
}

impl FeedWatchServer {
    /// Create a new server backed by the HTTP fetcher
    pub fn new(config: Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let monitor =
            FeedMonitor::from_config(&config).map_err(|e| ServerError::InitError(e.to_string()))?;

        Ok(Self::with_monitor(config, monitor))
    }

    /// Create a server around an already wired monitor
    pub fn with_monitor(config: Config, monitor: FeedMonitor) -> Self {
        let state = AppState {
            monitor: Arc::new(monitor),
            start_time: Instant::now(),
            config: config.clone(),
        };

        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router =
            create_router(self.state.clone()).merge(create_health_router(self.state.clone()));

        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Bind the configured address and serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.config.server.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener, then stop every refresh worker
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(e.to_string()))?;
        tracing::info!("Starting feedwatch server on {} (with graceful shutdown)", local_addr);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()));

        self.state.monitor.shutdown().await;
        tracing::info!("Feedwatch server shutdown complete");

        served
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        let monitor = &self.config.monitor;
        ServerInfo {
            bind_address: self.config.server.bind_address,
            feeds_limit: monitor.feeds_limit,
            refresh_interval: format_window(monitor.refresh_interval),
            idle_window: format_window(monitor.idle_window),
            failure_window: format_window(monitor.failure_window),
            request_logging_enabled: self.config.server.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub feeds_limit: usize,
    pub refresh_interval: String,
    pub idle_window: String,
    pub failure_window: String,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "FeedWatch Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Feeds Limit: {}\n\
             Refresh Interval: {}\n\
             Idle Window: {}\n\
             Failure Window: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.feeds_limit,
            self.refresh_interval,
            self.idle_window,
            self.failure_window,
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Initialization error
    #[error("Initialization error: {0}")]
    InitError(String),

    /// Failed to bind to address
    #[error("Failed to bind: {0}")]
    BindError(String),

    /// Server error
    #[error("Server error: {0}")]
    ServeError(String),
}

// ============================================================================
// Tests
// ============================================================================
