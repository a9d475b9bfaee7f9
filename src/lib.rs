//! feedwatch - Feed monitoring service
//!
//! Watches remote job feeds (gzip-compressed XML archives with a `?stat`
//! sidecar), recounts their vacancies only when the stat size marker moves,
//! and serves the last known count over HTTP.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`feed`] - Resource fetcher, stat prober and archive counter
//! - [`monitor`] - Feed state store, refresh workers, tracking registry, lookups
//! - [`server`] - HTTP surface (`/feedinfo`, `/feeds`, `/health`, `/metrics`)
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use feedwatch::config::Config;
//! use feedwatch::server::FeedWatchServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = FeedWatchServer::new(config)?;
//!     server
//!         .start_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod monitor;
pub mod server;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, MonitorConfig, StaleResponse};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::feed::{ArchiveCounter, HttpFetcher, ResourceFetcher, StatProber};
    pub use crate::monitor::{FeedLookup, FeedMonitor, FeedState};
    pub use crate::server::FeedWatchServer;
}

// Direct re-exports for convenience
pub use error::{Error, Result};
