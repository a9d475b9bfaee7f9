//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use chrono::{DateTime, Utc};
use regex::bytes::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Extract the size marker from a stat sidecar body
///
/// The stat endpoint reports `size:<digits> bytes` somewhere in its body;
/// the digits are returned verbatim and only ever compared for equality.
/// The rest of the body may hold arbitrary bytes.
pub fn extract_size_marker(body: &[u8]) -> Option<&str> {
    static SIZE_RE: OnceLock<Regex> = OnceLock::new();

    let re = SIZE_RE.get_or_init(|| Regex::new(r"size:(\d+) bytes").expect("Invalid regex pattern"));

    re.captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
}

/// Check whether more than `window` has passed between `since` and `now`
///
/// A `since` in the future never exceeds the window.
pub fn elapsed_exceeds(since: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    (now - since)
        .to_std()
        .map(|elapsed| elapsed > window)
        .unwrap_or(false)
}

/// Format a duration as whole hours, minutes or seconds for log lines
pub fn format_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else if secs > 0 {
        format!("{secs}s")
    } else {
        format!("{}ms", window.as_millis())
    }
}
