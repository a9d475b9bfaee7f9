//! Per-feed refresh worker
//!
//! One worker runs for every tracked feed. It refreshes immediately on start,
//! then once per refresh interval, and exits when the registry retires the
//! feed for being idle or when the registry shuts down.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::registry::TrackingRegistry;
use super::store::{FeedStateStore, RefreshOutcome};
use crate::metrics;

/// Lifecycle of a live worker as seen by the registry
///
/// A terminated worker has no registry entry and is never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Spawned, first refresh not finished yet
    Starting,

    /// First refresh done, ticking
    Running,
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Retired after the idle window passed without a lookup
    Idle,

    /// Stopped by registry shutdown
    Cancelled,
}

/// Timing knobs of a worker
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub refresh_interval: Duration,
    pub evict_idle_while_failing: bool,
}

/// Background refresh loop of one feed
pub struct RefreshWorker {
    url: String,
    store: Arc<FeedStateStore>,
    registry: Arc<TrackingRegistry>,
    settings: WorkerSettings,
}

impl RefreshWorker {
    /// Create a worker for `url`
    pub fn new(
        url: impl Into<String>,
        store: Arc<FeedStateStore>,
        registry: Arc<TrackingRegistry>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            url: url.into(),
            store,
            registry,
            settings,
        }
    }

    /// Run until retired or until `shutdown` turns true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> WorkerExit {
        let exit = tokio::select! {
            biased;
            _ = async {
                let _ = shutdown.wait_for(|stop| *stop).await;
            } => WorkerExit::Cancelled,
            exit = self.refresh_loop() => exit,
        };

        tracing::debug!(url = %self.url, exit = ?exit, "Refresh worker stopped");
        exit
    }

    async fn refresh_loop(&self) -> WorkerExit {
        let mut interval = tokio::time::interval(self.settings.refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut started = false;

        loop {
            // The first tick completes immediately
            interval.tick().await;

            let healthy = self.refresh_once().await;

            if !started {
                self.registry.mark_running(&self.url).await;
                started = true;
            }

            if (healthy || self.settings.evict_idle_while_failing)
                && self.registry.retire_if_idle(&self.url).await
            {
                return WorkerExit::Idle;
            }
        }
    }

    /// One refresh attempt with failure bookkeeping; true on success
    async fn refresh_once(&self) -> bool {
        match self.store.refresh_if_changed(&self.url).await {
            Ok(RefreshOutcome::Unchanged) => {
                metrics::record_refresh("unchanged");
                true
            }
            Ok(RefreshOutcome::Recounted { .. }) => {
                metrics::record_refresh("recounted");
                true
            }
            Err(e) => {
                metrics::record_refresh(e.outcome_label());
                let failing_since = self.store.record_failure(&self.url, Utc::now()).await;
                let e = crate::Error::from(e);
                tracing::warn!(
                    url = %self.url,
                    category = e.category().as_str(),
                    error = %e,
                    failing_since = ?failing_since,
                    "Feed refresh failed"
                );
                false
            }
        }
    }
}
