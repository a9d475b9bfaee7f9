//! Feed state store
//!
//! Holds the last known observation of every tracked feed. A refresh probes
//! the stat sidecar first and only pays for an archive count when the size
//! marker moved. The stat/marker/count triple is always published as one
//! new value, so readers never see a mix of two observations.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::feed::{ArchiveCounter, CountError, StatError, StatProber};
use crate::metrics;

// ============================================================================
// Feed State
// ============================================================================

/// Last known observation of a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    /// Change-detection token taken from the stat sidecar
    pub size_marker: String,

    /// Raw stat body, never re-encoded
    pub raw_stat: Bytes,

    /// Item elements counted in the archive matching `size_marker`
    pub vacancy_count: u64,

    /// First failure of the current failing streak
    pub failing_since: Option<DateTime<Utc>>,
}

impl FeedState {
    /// Client-facing summary line: the raw stat followed by the count
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = self.raw_stat.to_vec();
        payload.extend_from_slice(format!(", vacanciesCount: {}", self.vacancy_count).as_bytes());
        payload
    }

    /// Check whether the failing streak is older than `window` at `now`
    pub fn is_failing_longer_than(&self, window: std::time::Duration, now: DateTime<Utc>) -> bool {
        self.failing_since
            .is_some_and(|since| crate::utils::elapsed_exceeds(since, now, window))
    }
}

// ============================================================================
// Refresh Outcome
// ============================================================================

/// Successful refresh result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Size marker unchanged, nothing recounted
    Unchanged,

    /// Archive recounted and a new state published
    Recounted { vacancy_count: u64 },
}

/// Failed refresh; the stored state is left untouched
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The stat sidecar could not be probed
    #[error("feed unreachable: {0}")]
    Unreachable(#[from] StatError),

    /// The archive could not be fetched or decoded
    #[error("vacancy count failed: {0}")]
    Decode(#[from] CountError),
}

impl RefreshError {
    /// Metric label of the failure
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::Decode(_) => "decode_error",
        }
    }
}

// ============================================================================
// Feed State Store
// ============================================================================

/// Store of feed states keyed by feed URL
pub struct FeedStateStore {
    feeds: RwLock<HashMap<String, FeedState>>,
    prober: StatProber,
    counter: ArchiveCounter,
}

impl FeedStateStore {
    /// Create an empty store on top of the two leaves
    pub fn new(prober: StatProber, counter: ArchiveCounter) -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            prober,
            counter,
        }
    }

    /// Stat prober shared with the admission path
    pub fn prober(&self) -> &StatProber {
        &self.prober
    }

    /// Refresh the state of `url`, recounting only when its size marker changed
    ///
    /// No lock is held across network calls. Either the whole state is
    /// replaced or it stays exactly as it was.
    pub async fn refresh_if_changed(&self, url: &str) -> Result<RefreshOutcome, RefreshError> {
        let probe = self.prober.probe(url).await?;

        let unchanged = self
            .feeds
            .read()
            .await
            .get(url)
            .is_some_and(|state| state.size_marker == probe.size_marker);

        if unchanged {
            if let Some(state) = self.feeds.write().await.get_mut(url) {
                state.failing_since = None;
            }
            tracing::debug!(url = %url, size = %probe.size_marker, "Feed unchanged, skipping count");
            return Ok(RefreshOutcome::Unchanged);
        }

        tracing::info!(url = %url, size = %probe.size_marker, "Counting vacancies");
        let vacancy_count = {
            let _timer = metrics::start_recount_timer();
            self.counter.count(url).await?
        };

        let state = FeedState {
            size_marker: probe.size_marker,
            raw_stat: probe.raw_stat,
            vacancy_count,
            failing_since: None,
        };
        self.feeds.write().await.insert(url.to_string(), state);

        tracing::info!(url = %url, vacancy_count, "Vacancy count updated");
        Ok(RefreshOutcome::Recounted { vacancy_count })
    }

    /// Start a failing streak at `now` unless one is already running
    ///
    /// Returns the streak start, or `None` when the feed has no state yet.
    pub async fn record_failure(&self, url: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut feeds = self.feeds.write().await;
        let state = feeds.get_mut(url)?;
        Some(*state.failing_since.get_or_insert(now))
    }

    /// Snapshot of the state of `url`
    pub async fn get(&self, url: &str) -> Option<FeedState> {
        self.feeds.read().await.get(url).cloned()
    }

    /// Drop the state of `url`
    pub async fn remove(&self, url: &str) -> Option<FeedState> {
        self.feeds.write().await.remove(url)
    }

    /// Number of feeds with a state
    pub async fn len(&self) -> usize {
        self.feeds.read().await.len()
    }

    /// Check if no feed has a state
    pub async fn is_empty(&self) -> bool {
        self.feeds.read().await.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
