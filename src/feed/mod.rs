//! Feed leaves: fetching, stat probing and archive counting
//!
//! - [`fetcher`] - HTTP access to feed bodies behind the [`ResourceFetcher`] trait
//! - [`stat`] - `?stat` sidecar probing and size-marker extraction
//! - [`archive`] - gzip/XML decoding and item-element counting

pub mod archive;
pub mod fetcher;
pub mod stat;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::{ArchiveCounter, ArchiveDecoder, CountError, GzipXmlDecoder};
pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use stat::{StatError, StatProbe, StatProber};
