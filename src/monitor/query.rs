//! Query coordinator
//!
//! Entry point of every inbound lookup: makes sure the feed is tracked,
//! then classifies whatever the store currently holds for it.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::registry::{AdmissionError, TrackingRegistry};
use super::store::{FeedState, FeedStateStore};
use crate::config::{Config, MonitorConfig, StaleResponse};
use crate::feed::{
    ArchiveCounter, ArchiveDecoder, GzipXmlDecoder, HttpFetcher, ResourceFetcher, StatProber,
};

/// Result of a feed lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLookup {
    /// Tracked, first refresh not finished yet
    Pending,

    /// Healthy or failing for less than the failure window
    Ready(FeedState),

    /// Failing for longer than the failure window
    Stale(FeedState),

    /// Liveness probe failed, not tracked
    NotFound,

    /// Registry full, feed not tracked
    LimitExhausted { limit: usize, tracked: Vec<String> },

    /// Monitor is shutting down
    Unavailable,
}

/// Lookup side of the monitor
pub struct FeedMonitor {
    registry: Arc<TrackingRegistry>,
    store: Arc<FeedStateStore>,
    failure_window: Duration,
    stale_response: StaleResponse,
}

impl FeedMonitor {
    /// Wire a monitor on top of the given fetcher and decoder
    pub fn new(
        config: &MonitorConfig,
        fetcher: Arc<dyn ResourceFetcher>,
        decoder: Arc<dyn ArchiveDecoder>,
    ) -> Self {
        let prober = StatProber::new(Arc::clone(&fetcher));
        let counter = ArchiveCounter::new(fetcher, decoder, config.item_element.clone());
        let store = Arc::new(FeedStateStore::new(prober, counter));
        let registry = Arc::new(TrackingRegistry::new(config, Arc::clone(&store)));

        Self {
            registry,
            store,
            failure_window: config.failure_window,
            stale_response: config.stale_response,
        }
    }

    /// Monitor backed by [`HttpFetcher`] and [`GzipXmlDecoder`]
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        config
            .monitor
            .validate()
            .map_err(|e| crate::Error::config(format!("{e:#}")))?;
        let fetcher = HttpFetcher::with_config(&config.fetcher)?;
        Ok(Self::new(
            &config.monitor,
            Arc::new(fetcher),
            Arc::new(GzipXmlDecoder),
        ))
    }

    /// Look up `url`, admitting it for tracking when needed
    pub async fn lookup(&self, url: &str) -> FeedLookup {
        match self.registry.ensure_tracked(url).await {
            Ok(_) => {}
            Err(AdmissionError::NotAlive) => return FeedLookup::NotFound,
            Err(AdmissionError::CapacityExceeded { limit, tracked }) => {
                return FeedLookup::LimitExhausted { limit, tracked };
            }
            Err(AdmissionError::ShuttingDown) => return FeedLookup::Unavailable,
        }

        let Some(state) = self.store.get(url).await else {
            return FeedLookup::Pending;
        };

        if state.is_failing_longer_than(self.failure_window, Utc::now()) {
            tracing::debug!(url = %url, failing_since = ?state.failing_since, "Serving stale feed");
            return FeedLookup::Stale(state);
        }

        FeedLookup::Ready(state)
    }

    pub fn registry(&self) -> &Arc<TrackingRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<FeedStateStore> {
        &self.store
    }

    pub fn stale_response(&self) -> StaleResponse {
        self.stale_response
    }

    /// Stop all refresh workers
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
