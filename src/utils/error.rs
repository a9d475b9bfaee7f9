//! Error types for the feed leaves
//!
//! This module defines the transport and decoding errors shared by the
//! stat prober and the archive counter.

use thiserror::Error;

/// Errors that can occur while fetching a feed resource
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Upstream answered with a non-success status
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Body larger than the configured ceiling
    #[error("Response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Errors that can occur while decoding a compressed XML archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The stream is not valid gzip
    #[error("Gzip error: {0}")]
    Gzip(String),

    /// The decompressed stream is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// The blocking decoder task did not complete
    #[error("Decoder task failed: {0}")]
    Task(String),
}
