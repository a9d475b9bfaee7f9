//! Archive decoding and vacancy counting
//!
//! A feed archive is a gzip-compressed XML document. Counting walks the
//! decompressed stream once and tallies start tags with a given local name.
//! This is the one expensive operation of the service.

use std::io::BufReader;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::fetcher::ResourceFetcher;
use crate::utils::error::{ArchiveError, FetchError};

/// Turns a compressed archive into a stream of start-tag local names
pub trait ArchiveDecoder: Send + Sync {
    /// Call `visit` with the local name of every start (or empty) element
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::Gzip` for broken compression and
    /// `ArchiveError::Xml` for malformed markup. Nothing is counted partially:
    /// callers must discard whatever they tallied when an error comes back.
    fn visit_start_tags(&self, archive: &[u8], visit: &mut dyn FnMut(&str))
        -> Result<(), ArchiveError>;
}

/// gzip + XML decoder backed by `flate2` and `quick-xml`
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipXmlDecoder;

impl ArchiveDecoder for GzipXmlDecoder {
    fn visit_start_tags(
        &self,
        archive: &[u8],
        visit: &mut dyn FnMut(&str),
    ) -> Result<(), ArchiveError> {
        let mut reader = Reader::from_reader(BufReader::new(MultiGzDecoder::new(archive)));
        let mut buf = Vec::new();
        let mut depth = 0usize;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(element)) => {
                    visit(local_name(&element)?);
                    depth += 1;
                }
                Ok(Event::Empty(element)) => visit(local_name(&element)?),
                Ok(Event::End(_)) => depth = depth.saturating_sub(1),
                Ok(Event::Eof) if depth > 0 => {
                    return Err(ArchiveError::Xml(format!(
                        "unexpected end of document with {depth} unclosed elements"
                    )))
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                // gzip failures surface as I/O errors of the underlying reader
                Err(quick_xml::Error::Io(e)) => return Err(ArchiveError::Gzip(e.to_string())),
                Err(e) => {
                    return Err(ArchiveError::Xml(format!(
                        "at byte {}: {e}",
                        reader.buffer_position()
                    )))
                }
            }
            buf.clear();
        }

        Ok(())
    }
}

fn local_name<'a>(element: &'a BytesStart<'_>) -> Result<&'a str, ArchiveError> {
    std::str::from_utf8(element.local_name().into_inner())
        .map_err(|e| ArchiveError::Xml(format!("non UTF-8 element name: {e}")))
}

/// Errors of a full fetch-and-count pass
#[derive(Error, Debug)]
pub enum CountError {
    /// The archive could not be fetched
    #[error("archive fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The archive could not be decoded
    #[error("archive decode failed: {0}")]
    Decode(#[from] ArchiveError),
}

/// Counts item elements inside a feed archive
#[derive(Clone)]
pub struct ArchiveCounter {
    fetcher: Arc<dyn ResourceFetcher>,
    decoder: Arc<dyn ArchiveDecoder>,
    item_element: String,
}

impl ArchiveCounter {
    /// Create a counter for elements named `item_element`
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        decoder: Arc<dyn ArchiveDecoder>,
        item_element: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            decoder,
            item_element: item_element.into(),
        }
    }

    /// Name of the counted element
    pub fn item_element(&self) -> &str {
        &self.item_element
    }

    /// Fetch the archive behind `url` and count its item elements
    ///
    /// Decoding runs on the blocking pool.
    pub async fn count(&self, url: &str) -> Result<u64, CountError> {
        let archive = self.fetcher.fetch(url).await?;
        let decoder = Arc::clone(&self.decoder);
        let element = self.item_element.clone();

        let count = tokio::task::spawn_blocking(move || {
            let mut count = 0u64;
            decoder.visit_start_tags(&archive, &mut |name| {
                if name == element {
                    count += 1;
                }
            })?;
            Ok::<u64, ArchiveError>(count)
        })
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))??;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::{gzip, gzip_vacancies, FakeFetcher};

    const FEED: &str = "http://feeds.test/jobs.xml.gz";

    fn names(archive: &[u8]) -> Result<Vec<String>, ArchiveError> {
        let mut names = Vec::new();
        GzipXmlDecoder.visit_start_tags(archive, &mut |name| names.push(name.to_string()))?;
        Ok(names)
    }

    #[test]
    fn test_decoder_visits_start_and_empty_tags() {
        let archive = gzip(r#"<?xml version="1.0"?><source><vacancy id="1"/><vacancy><title>a</title></vacancy></source>"#);
        let names = names(&archive).unwrap();
        assert_eq!(names, vec!["source", "vacancy", "vacancy", "title"]);
    }

    #[test]
    fn test_decoder_strips_namespace_prefix() {
        let archive = gzip(r#"<feed xmlns:hh="urn:hh"><hh:vacancy/></feed>"#);
        let names = names(&archive).unwrap();
        assert_eq!(names, vec!["feed", "vacancy"]);
    }

    #[test]
    fn test_decoder_rejects_plain_bytes() {
        let result = names(b"<source><vacancy/></source>");
        assert!(matches!(result, Err(ArchiveError::Gzip(_))));
    }

    #[test]
    fn test_decoder_rejects_mismatched_tags() {
        let archive = gzip("<source><vacancy></source>");
        assert!(matches!(names(&archive), Err(ArchiveError::Xml(_))));
    }

    #[test]
    fn test_decoder_rejects_truncated_document() {
        let archive = gzip("<source><vacancy/><vacancy>");
        assert!(matches!(names(&archive), Err(ArchiveError::Xml(_))));
    }

    #[tokio::test]
    async fn test_count_vacancies() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_bytes(FEED, gzip_vacancies(3));

        let counter = ArchiveCounter::new(fetcher.clone(), Arc::new(GzipXmlDecoder), "vacancy");
        assert_eq!(counter.count(FEED).await.unwrap(), 3);
        assert_eq!(fetcher.calls(FEED), 1);
    }

    #[tokio::test]
    async fn test_count_other_element() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_bytes(FEED, gzip_vacancies(4));

        let counter = ArchiveCounter::new(fetcher, Arc::new(GzipXmlDecoder), "source");
        assert_eq!(counter.count(FEED).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_reports_fetch_errors() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_status(FEED, 500);

        let counter = ArchiveCounter::new(fetcher, Arc::new(GzipXmlDecoder), "vacancy");
        let result = counter.count(FEED).await;
        assert!(matches!(result, Err(CountError::Fetch(FetchError::Status(500)))));
    }

    #[tokio::test]
    async fn test_count_reports_decode_errors() {
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.set_body(FEED, "definitely not gzip");

        let counter = ArchiveCounter::new(fetcher, Arc::new(GzipXmlDecoder), "vacancy");
        let result = counter.count(FEED).await;
        assert!(matches!(result, Err(CountError::Decode(ArchiveError::Gzip(_)))));
    }
}
