//! In-memory feed fixtures for unit tests

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::fetcher::ResourceFetcher;
use super::stat::StatProber;
use crate::utils::error::FetchError;

enum FakeResponse {
    Body(Bytes),
    Status(u16),
}

/// Fetcher serving canned responses and counting calls per URL
#[derive(Default)]
pub(crate) struct FakeFetcher {
    responses: Mutex<HashMap<String, FakeResponse>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_bytes(&self, url: &str, body: Bytes) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), FakeResponse::Body(body));
    }

    pub(crate) fn set_body(&self, url: &str, body: &str) {
        self.set_bytes(url, Bytes::from(body.to_string()));
    }

    pub(crate) fn set_status(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), FakeResponse::Status(status));
    }

    /// Serve a healthy feed: stat with `size` and an archive of `count` vacancies
    pub(crate) fn set_feed(&self, url: &str, size: u64, count: usize) {
        self.set_body(&StatProber::stat_url(url), &stat_body(size));
        self.set_bytes(url, gzip_vacancies(count));
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ResourceFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        match self.responses.lock().unwrap().get(url) {
            Some(FakeResponse::Body(body)) => Ok(body.clone()),
            Some(FakeResponse::Status(status)) => Err(FetchError::Status(*status)),
            None => Err(FetchError::Status(404)),
        }
    }
}

pub(crate) fn stat_body(size: u64) -> String {
    format!("updated: 2024-05-01T10:00:00Z\nsize:{size} bytes\n")
}

pub(crate) fn gzip(xml: &str) -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

pub(crate) fn gzip_vacancies(count: usize) -> Bytes {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><source>"#);
    for id in 0..count {
        xml.push_str(&format!("<vacancy id=\"{id}\"><name>Engineer {id}</name></vacancy>"));
    }
    xml.push_str("</source>");
    gzip(&xml)
}
