//! Tracking registry for refresh workers
//!
//! This module owns the set of tracked feeds. It admits new feeds after a
//! liveness check, enforces the feeds limit, records when each feed was last
//! looked up, and supervises the refresh worker of every tracked feed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use super::store::FeedStateStore;
use super::worker::{RefreshWorker, WorkerExit, WorkerSettings, WorkerState};
use crate::config::MonitorConfig;
use crate::metrics;
use crate::utils::{elapsed_exceeds, format_window};

// ============================================================================
// Tracking Entry
// ============================================================================

/// Registry bookkeeping of one tracked feed
struct TrackingEntry {
    /// When the feed was admitted
    tracked_since: DateTime<Utc>,

    /// Most recent lookup
    last_observed_at: DateTime<Utc>,

    /// Worker lifecycle
    state: WorkerState,

    /// Worker task, taken on shutdown
    handle: Option<JoinHandle<WorkerExit>>,
}

/// Public snapshot of a tracked feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedFeed {
    pub url: String,
    pub tracked_since: DateTime<Utc>,
    pub last_observed_at: DateTime<Utc>,
    pub state: WorkerState,
}

/// Result of a successful `ensure_tracked`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A worker already existed
    AlreadyTracked,

    /// A new worker was started
    Admitted,
}

// ============================================================================
// Errors
// ============================================================================

/// Admission errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The liveness probe failed
    #[error("feed is not alive")]
    NotAlive,

    /// Registry at capacity; `tracked` lists the current occupants
    #[error("feeds limit ({limit}) is exhausted")]
    CapacityExceeded { limit: usize, tracked: Vec<String> },

    /// Registry is shutting down
    #[error("tracking registry is shutting down")]
    ShuttingDown,
}

// ============================================================================
// Tracking Registry
// ============================================================================

/// Registry of tracked feeds and supervisor of their workers
pub struct TrackingRegistry {
    /// Tracked feeds by URL
    entries: RwLock<HashMap<String, TrackingEntry>>,

    /// Shared feed states
    store: Arc<FeedStateStore>,

    /// Max tracked feeds
    feeds_limit: usize,

    /// Tracking ends after this long without a lookup
    idle_window: Duration,

    /// Settings handed to every worker
    worker_settings: WorkerSettings,

    /// Flipped to true on shutdown
    shutdown: watch::Sender<bool>,
}

impl TrackingRegistry {
    /// Create a new registry
    pub fn new(config: &MonitorConfig, store: Arc<FeedStateStore>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            entries: RwLock::new(HashMap::new()),
            store,
            feeds_limit: config.feeds_limit,
            idle_window: config.idle_window,
            worker_settings: WorkerSettings {
                refresh_interval: config.refresh_interval,
                evict_idle_while_failing: config.evict_idle_while_failing,
            },
            shutdown,
        }
    }

    /// Make sure `url` has a refresh worker and stamp its last lookup
    pub async fn ensure_tracked(self: &Arc<Self>, url: &str) -> Result<Admission, AdmissionError> {
        if self.observe(url).await {
            return Ok(Admission::AlreadyTracked);
        }

        if !self.store.prober().is_alive(url).await {
            tracing::info!(url = %url, "Feed isn't alive, refusing to track");
            return Err(AdmissionError::NotAlive);
        }

        let mut entries = self.entries.write().await;
        let now = Utc::now();

        // Another lookup may have admitted the feed while we probed
        if let Some(entry) = entries.get_mut(url) {
            entry.last_observed_at = now;
            return Ok(Admission::AlreadyTracked);
        }

        if entries.len() >= self.feeds_limit {
            let mut tracked: Vec<String> = entries.keys().cloned().collect();
            tracked.sort();
            tracing::warn!(url = %url, limit = self.feeds_limit, "Feeds limit is exhausted");
            return Err(AdmissionError::CapacityExceeded {
                limit: self.feeds_limit,
                tracked,
            });
        }

        if *self.shutdown.borrow() {
            return Err(AdmissionError::ShuttingDown);
        }

        let worker = RefreshWorker::new(
            url,
            Arc::clone(&self.store),
            Arc::clone(self),
            self.worker_settings,
        );
        let handle = tokio::spawn(worker.run(self.shutdown.subscribe()));

        entries.insert(
            url.to_string(),
            TrackingEntry {
                tracked_since: now,
                last_observed_at: now,
                state: WorkerState::Starting,
                handle: Some(handle),
            },
        );
        metrics::set_tracked_feeds(entries.len());

        tracing::info!(url = %url, tracked = entries.len(), "Started monitoring feed");
        Ok(Admission::Admitted)
    }

    /// Stamp the last lookup of `url`; false when it is not tracked
    pub async fn observe(&self, url: &str) -> bool {
        match self.entries.write().await.get_mut(url) {
            Some(entry) => {
                entry.last_observed_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Record that the worker of `url` finished its first refresh
    pub async fn mark_running(&self, url: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(url) {
            entry.state = WorkerState::Running;
        }
    }

    /// Retire `url` if nobody looked it up within the idle window
    ///
    /// The check and the removal of both the entry and the feed state happen
    /// under one registry lock, so a concurrent lookup either lands before
    /// (and keeps the feed) or after (and re-enters admission). Returns true
    /// when the worker must stop.
    pub async fn retire_if_idle(&self, url: &str) -> bool {
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get(url) else {
            return true;
        };

        if !elapsed_exceeds(entry.last_observed_at, Utc::now(), self.idle_window) {
            return false;
        }

        entries.remove(url);
        self.store.remove(url).await;
        metrics::set_tracked_feeds(entries.len());
        metrics::record_eviction("idle");

        tracing::info!(
            url = %url,
            idle_window = %format_window(self.idle_window),
            "Feed info not requested within idle window, cancelling monitoring"
        );
        true
    }

    /// Stop every worker and wait for it to exit
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let drained: Vec<(String, TrackingEntry)> = self.entries.write().await.drain().collect();
        metrics::set_tracked_feeds(0);

        for (url, mut entry) in drained {
            if let Some(handle) = entry.handle.take() {
                match handle.await {
                    Ok(exit) => tracing::debug!(url = %url, exit = ?exit, "Worker joined"),
                    Err(e) => tracing::warn!(url = %url, error = %e, "Worker task failed"),
                }
            }
            // Only after the join: an in-flight refresh could republish it
            self.store.remove(&url).await;
        }

        tracing::info!("Tracking registry shut down");
    }

    /// Check if `url` is tracked
    pub async fn contains(&self, url: &str) -> bool {
        self.entries.read().await.contains_key(url)
    }

    /// Tracked URLs, sorted
    pub async fn tracked_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.entries.read().await.keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Snapshot of every tracked feed, sorted by URL
    pub async fn snapshot(&self) -> Vec<TrackedFeed> {
        let mut feeds: Vec<TrackedFeed> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(url, entry)| TrackedFeed {
                url: url.clone(),
                tracked_since: entry.tracked_since,
                last_observed_at: entry.last_observed_at,
                state: entry.state,
            })
            .collect();
        feeds.sort_by(|a, b| a.url.cmp(&b.url));
        feeds
    }

    /// Number of tracked feeds
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if no feed is tracked
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Max tracked feeds
    pub fn feeds_limit(&self) -> usize {
        self.feeds_limit
    }

    /// Get registry statistics
    pub async fn stats(&self) -> RegistryStats {
        let entries = self.entries.read().await;

        let mut starting = 0;
        let mut running = 0;
        for entry in entries.values() {
            match entry.state {
                WorkerState::Starting => starting += 1,
                WorkerState::Running => running += 1,
            }
        }

        RegistryStats {
            tracked: entries.len(),
            feeds_limit: self.feeds_limit,
            starting,
            running,
        }
    }
}

/// Registry statistics
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub tracked: usize,
    pub feeds_limit: usize,
    pub starting: usize,
    pub running: usize,
}

impl RegistryStats {
    /// Check if no slot is left
    pub fn is_full(&self) -> bool {
        self.tracked >= self.feeds_limit
    }
}

// ============================================================================
// Tests
// ============================================================================
