//! Resource fetcher for feed archives and stat sidecars
//!
//! The fetcher is the only place that talks HTTP to upstream feeds. It returns
//! the raw body bytes; decompression is left to the archive decoder, so the
//! client is built without transparent content decoding. Bodies are buffered
//! whole, up to `FetcherConfig::max_body_bytes`.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use url::Url;

use crate::config::FetcherConfig;
use crate::utils::error::FetchError;

/// Source of feed bodies
///
/// Implemented by [`HttpFetcher`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the full body behind `url`
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Status` for non-success responses,
    /// `FetchError::TooLarge` past the body ceiling and
    /// `FetchError::Http`/`FetchError::Timeout` for transport failures
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// HTTP implementation of [`ResourceFetcher`]
pub struct HttpFetcher {
    /// HTTP client with configured timeout and user agent
    client: Client,

    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(&FetcherConfig::default())
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}
