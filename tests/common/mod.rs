//! Common test utilities

#![allow(dead_code)]

use std::io::Write;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, ResponseTemplate};

use feedwatch::config::{Config, MonitorConfig};
use feedwatch::server::{AppState, FeedWatchServer};

/// Matches `<feed>?stat` requests
pub struct StatQuery;

impl Match for StatQuery {
    fn matches(&self, request: &wiremock::Request) -> bool {
        request.url.query() == Some("stat")
    }
}

/// Matches requests without a query string
pub struct NoQuery;

impl Match for NoQuery {
    fn matches(&self, request: &wiremock::Request) -> bool {
        request.url.query().is_none()
    }
}

pub fn stat_body(size: u64) -> String {
    format!("updated: 2024-05-01T10:00:00Z\nsize:{size} bytes\n")
}

pub fn gzip_vacancies(count: usize) -> Vec<u8> {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><source>"#);
    for id in 0..count {
        xml.push_str(&format!(
            "<vacancy id=\"{id}\"><name>Engineer {id}</name><region>Remote</region></vacancy>"
        ));
    }
    xml.push_str("</source>");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Serve a healthy feed at `feed_path`
pub async fn mount_feed(server: &MockServer, feed_path: &str, size: u64, count: usize) {
    Mock::given(method("GET"))
        .and(path(feed_path))
        .and(StatQuery)
        .respond_with(ResponseTemplate::new(200).set_body_string(stat_body(size)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(feed_path))
        .and(NoQuery)
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip_vacancies(count)))
        .mount(server)
        .await;
}

/// Number of archive (non-stat) requests received for `feed_path`
pub async fn archive_requests(server: &MockServer, feed_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == feed_path && r.url.query().is_none())
        .count()
}

/// Config with millisecond timings
pub fn fast_config(feeds_limit: usize, idle: Duration, failure: Duration) -> Config {
    let mut config = Config::default();
    config.server.enable_request_logging = false;
    config.fetcher.request_timeout = Duration::from_secs(5);
    config.monitor = MonitorConfig::builder()
        .feeds_limit(feeds_limit)
        .refresh_interval(Duration::from_millis(20))
        .idle_window(idle)
        .failure_window(failure)
        .build()
        .unwrap();
    config
}

pub fn create_app(config: Config) -> (Router, AppState) {
    let server = FeedWatchServer::new(config).unwrap();
    (server.build_router(), server.state())
}

pub fn feedinfo_uri(feed_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(feed_url.as_bytes()).collect();
    format!("/feedinfo?url={encoded}")
}

pub async fn get_bytes(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let (status, body) = get_bytes(router, uri).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// Repeat `GET uri` until `done` accepts the response or two seconds pass
pub async fn poll_until<F>(router: &Router, uri: &str, mut done: F) -> (StatusCode, String)
where
    F: FnMut(StatusCode, &str) -> bool,
{
    let mut last = get(router, uri).await;
    for _ in 0..200 {
        if done(last.0, &last.1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        last = get(router, uri).await;
    }
    last
}
