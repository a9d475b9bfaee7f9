//! Stat sidecar prober
//!
//! Every feed exposes `<url>?stat`, whose body carries a `size:<N> bytes`
//! marker. The marker doubles as a liveness check and as the change-detection
//! token that decides whether the archive has to be counted again.

use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use super::fetcher::ResourceFetcher;
use crate::utils::error::FetchError;
use crate::utils::extract_size_marker;

/// Errors that make a feed unreachable
#[derive(Error, Debug)]
pub enum StatError {
    /// Transport failure or non-success status
    #[error("stat fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The body carries no `size:<N> bytes` marker
    #[error("stat body has no size marker")]
    MissingSizeMarker,
}

/// Result of a successful stat probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatProbe {
    /// Digits of the size marker, compared verbatim
    pub size_marker: String,

    /// Raw stat body, returned to clients byte for byte
    pub raw_stat: Bytes,
}

/// Prober for stat sidecars
#[derive(Clone)]
pub struct StatProber {
    fetcher: Arc<dyn ResourceFetcher>,
}

impl StatProber {
    /// Create a prober on top of a resource fetcher
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { fetcher }
    }

    /// Build the stat sidecar URL of a feed
    pub fn stat_url(url: &str) -> String {
        format!("{url}?stat")
    }

    /// Fetch the stat sidecar and extract its size marker
    pub async fn probe(&self, url: &str) -> Result<StatProbe, StatError> {
        let raw_stat = self.fetcher.fetch(&Self::stat_url(url)).await?;

        let size_marker = extract_size_marker(&raw_stat)
            .ok_or(StatError::MissingSizeMarker)?
            .to_string();

        Ok(StatProbe {
            size_marker,
            raw_stat,
        })
    }

    /// Cheap liveness check
    pub async fn is_alive(&self, url: &str) -> bool {
        match self.probe(url).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Liveness probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::FakeFetcher;

    const FEED: &str = "http://feeds.test/jobs.xml.gz";

    #[test]
    fn test_stat_url() {
        assert_eq!(StatProber::stat_url(FEED), "http://feeds.test/jobs.xml.gz?stat");
    }

    #[tokio::test]
    async fn test_probe_success() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_feed(FEED, 100, 3);

        let prober = StatProber::new(fetcher.clone());
        let probe = prober.probe(FEED).await.unwrap();

        assert_eq!(probe.size_marker, "100");
        assert_eq!(probe.raw_stat, crate::feed::testing::stat_body(100));
        assert_eq!(fetcher.calls(&StatProber::stat_url(FEED)), 1);
        assert_eq!(fetcher.calls(FEED), 0);
    }

    #[tokio::test]
    async fn test_probe_keeps_non_utf8_stat_bytes() {
        let fetcher = Arc::new(FakeFetcher::new());
        let body: &[u8] = b"name:\xff\xfe size:100 bytes";
        fetcher.set_bytes(&StatProber::stat_url(FEED), Bytes::from_static(body));

        let probe = StatProber::new(fetcher).probe(FEED).await.unwrap();

        assert_eq!(probe.size_marker, "100");
        assert_eq!(&probe.raw_stat[..], body);
    }

    #[tokio::test]
    async fn test_probe_non_success_status() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_status(&StatProber::stat_url(FEED), 503);

        let prober = StatProber::new(fetcher);
        let result = prober.probe(FEED).await;

        assert!(matches!(result, Err(StatError::Fetch(FetchError::Status(503)))));
        assert!(!prober.is_alive(FEED).await);
    }

    #[tokio::test]
    async fn test_probe_missing_marker() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_body(&StatProber::stat_url(FEED), "updated yesterday");

        let prober = StatProber::new(fetcher);
        let result = prober.probe(FEED).await;

        assert!(matches!(result, Err(StatError::MissingSizeMarker)));
    }

    #[tokio::test]
    async fn test_unknown_feed_is_not_alive() {
        let prober = StatProber::new(Arc::new(FakeFetcher::new()));
        assert!(!prober.is_alive(FEED).await);
    }
}
