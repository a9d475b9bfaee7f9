//! One-shot feed diagnostic

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use feedwatch::config::FetcherConfig;
use feedwatch::feed::{ArchiveCounter, GzipXmlDecoder, HttpFetcher, StatProbe, StatProber};

/// Parameters of the check command
pub struct CheckParams {
    pub url: String,
    pub item_element: String,
    pub timeout: Option<u64>,
    pub fetcher: FetcherConfig,
}

/// Probe the stat sidecar of a feed, then count its archive
pub async fn check(params: CheckParams) -> Result<()> {
    let CheckParams {
        url,
        item_element,
        timeout,
        mut fetcher,
    } = params;

    if let Some(timeout) = timeout {
        fetcher.request_timeout = Duration::from_secs(timeout);
    }

    println!("Checking feed {url}");

    match inspect(&url, &item_element, &fetcher).await {
        Ok((probe, count)) => {
            println!("  Size marker: {}", probe.size_marker);
            println!("  {item_element} elements: {count}");
            println!();
            println!(
                "{}, vacanciesCount: {count}",
                String::from_utf8_lossy(&probe.raw_stat)
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(url = %url, category = e.category().as_str(), error = %e, "Feed check failed");
            println!("  Failed ({}): {e}", e.category().as_str());
            Err(e.into())
        }
    }
}

async fn inspect(
    url: &str,
    item_element: &str,
    config: &FetcherConfig,
) -> feedwatch::Result<(StatProbe, u64)> {
    let fetcher = Arc::new(HttpFetcher::with_config(config)?);
    let prober = StatProber::new(fetcher.clone());
    let counter = ArchiveCounter::new(fetcher, Arc::new(GzipXmlDecoder), item_element);

    let probe = prober.probe(url).await?;
    let count = counter.count(url).await?;
    Ok((probe, count))
}
