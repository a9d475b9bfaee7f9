//! Configuration management for feedwatch
//!
//! This module handles loading and validating configuration from environment variables
//! and TOML files. Every field has a default, so an empty file is a valid config.

mod duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use duration::duration_secs;

/// Default number of feeds that may be tracked at once
pub const DEFAULT_FEEDS_LIMIT: usize = 32;

/// Default element name counted inside feed archives
pub const DEFAULT_ITEM_ELEMENT: &str = "vacancy";

const DEFAULT_BIND_ADDRESS: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);
const SIX_HOURS: Duration = Duration::from_secs(6 * 60 * 60);
const DEFAULT_MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Feed tracking and refresh configuration
    pub monitor: MonitorConfig,

    /// Outbound fetcher configuration
    pub fetcher: FetcherConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable request logging
    pub enable_request_logging: bool,
}

/// What a lookup returns once a feed has been failing past the failure window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResponse {
    /// 417 with the fixed message followed by the last known payload
    #[default]
    MessageAndPayload,

    /// 417 with the fixed message only
    MessageOnly,
}

impl FromStr for StaleResponse {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "message_and_payload" => Ok(Self::MessageAndPayload),
            "message_only" => Ok(Self::MessageOnly),
            other => anyhow::bail!(
                "expected 'message_and_payload' or 'message_only', got '{other}'"
            ),
        }
    }
}

/// Feed tracking and refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum number of concurrently tracked feeds
    pub feeds_limit: usize,

    /// Period between two refresh attempts of one feed
    #[serde(with = "duration_secs", rename = "refresh_interval_secs")]
    pub refresh_interval: Duration,

    /// Tracking is torn down after this long without a lookup
    #[serde(with = "duration_secs", rename = "idle_window_secs")]
    pub idle_window: Duration,

    /// Lookups report a hard failure after this long of failed refreshes
    #[serde(with = "duration_secs", rename = "failure_window_secs")]
    pub failure_window: Duration,

    /// Local name of the counted element
    pub item_element: String,

    /// Check the idle window after failed refreshes too
    pub evict_idle_while_failing: bool,

    /// Body of the 417 response
    pub stale_response: StaleResponse,
}

/// Outbound fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Request timeout
    #[serde(with = "duration_secs", rename = "request_timeout_secs")]
    pub request_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Largest accepted response body; archives are held in memory while counted
    pub max_body_bytes: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(DEFAULT_BIND_ADDRESS),
            enable_request_logging: true,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feeds_limit: DEFAULT_FEEDS_LIMIT,
            refresh_interval: Duration::from_secs(60),
            idle_window: SIX_HOURS,
            failure_window: SIX_HOURS,
            item_element: DEFAULT_ITEM_ELEMENT.to_string(),
            evict_idle_while_failing: true,
            stale_response: StaleResponse::default(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: format!("feedwatch/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Parse `key` when it is set; a set but unparsable value is an error
fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {key}={value}: {e}")),
        Err(_) => Ok(None),
    }
}

fn env_secs(key: &str) -> Result<Option<Duration>> {
    Ok(env_parsed::<u64>(key)?.map(Duration::from_secs))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address = env_parsed::<SocketAddr>("FEEDWATCH_BIND_ADDRESS")?
            .unwrap_or(defaults.server.bind_address);

        let enable_request_logging = env_parsed("FEEDWATCH_ENABLE_REQUEST_LOGGING")?
            .unwrap_or(defaults.server.enable_request_logging);

        let monitor = MonitorConfig {
            feeds_limit: env_parsed("FEEDWATCH_FEEDS_LIMIT")?
                .unwrap_or(defaults.monitor.feeds_limit),
            refresh_interval: env_secs("FEEDWATCH_REFRESH_INTERVAL_SECS")?
                .unwrap_or(defaults.monitor.refresh_interval),
            idle_window: env_secs("FEEDWATCH_IDLE_WINDOW_SECS")?
                .unwrap_or(defaults.monitor.idle_window),
            failure_window: env_secs("FEEDWATCH_FAILURE_WINDOW_SECS")?
                .unwrap_or(defaults.monitor.failure_window),
            item_element: std::env::var("FEEDWATCH_ITEM_ELEMENT")
                .unwrap_or(defaults.monitor.item_element),
            evict_idle_while_failing: env_parsed("FEEDWATCH_EVICT_IDLE_WHILE_FAILING")?
                .unwrap_or(defaults.monitor.evict_idle_while_failing),
            stale_response: env_parsed("FEEDWATCH_STALE_RESPONSE")?
                .unwrap_or(defaults.monitor.stale_response),
        };

        let request_timeout = env_secs("FEEDWATCH_REQUEST_TIMEOUT_SECS")?
            .unwrap_or(defaults.fetcher.request_timeout);

        let user_agent =
            std::env::var("FEEDWATCH_USER_AGENT").unwrap_or(defaults.fetcher.user_agent);

        let max_body_bytes = env_parsed("FEEDWATCH_MAX_BODY_BYTES")?
            .unwrap_or(defaults.fetcher.max_body_bytes);

        let log_level = std::env::var("FEEDWATCH_LOG_LEVEL").unwrap_or(defaults.logging.level);

        let log_format = std::env::var("FEEDWATCH_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            server: ServerConfig {
                bind_address,
                enable_request_logging,
            },
            monitor,
            fetcher: FetcherConfig {
                request_timeout,
                user_agent,
                max_body_bytes,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, from `FEEDWATCH_*` variables otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env().context("Failed to load configuration from environment"),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;

        if self.fetcher.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.fetcher.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        self.logging.validate()
    }
}

impl LoggingConfig {
    /// Apply the command-line flags on top of the configured values
    pub fn with_overrides(mut self, format: Option<&str>, verbose: bool) -> Self {
        if let Some(format) = format {
            self.format = format.to_string();
        }
        if verbose {
            self.level = String::from("debug");
        }
        self
    }

    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub fn filter_directives(&self) -> String {
        format!("feedwatch={0},tower_http={0},warn", self.level)
    }

    /// Check if JSON output is selected
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }

    /// Validate level and format
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            anyhow::bail!(
                "log level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.level
            );
        }

        if !matches!(self.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json', got '{}'", self.format);
        }

        Ok(())
    }
}

impl MonitorConfig {
    /// Create a new config builder
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Validate the monitor settings
    pub fn validate(&self) -> Result<()> {
        if self.feeds_limit == 0 {
            anyhow::bail!("feeds_limit must be greater than 0");
        }

        if self.refresh_interval.is_zero() {
            anyhow::bail!("refresh_interval must be greater than 0");
        }

        if self.idle_window < self.refresh_interval {
            anyhow::bail!("idle_window must not be shorter than refresh_interval");
        }

        if self.failure_window < self.refresh_interval {
            anyhow::bail!("failure_window must not be shorter than refresh_interval");
        }

        if self.item_element.trim().is_empty() {
            anyhow::bail!("item_element must not be empty");
        }

        Ok(())
    }
}

/// Builder for MonitorConfig
#[derive(Debug, Default)]
pub struct MonitorConfigBuilder {
    feeds_limit: Option<usize>,
    refresh_interval: Option<Duration>,
    idle_window: Option<Duration>,
    failure_window: Option<Duration>,
    item_element: Option<String>,
    evict_idle_while_failing: Option<bool>,
    stale_response: Option<StaleResponse>,
}

impl MonitorConfigBuilder {
    /// Set the tracking capacity
    pub fn feeds_limit(mut self, limit: usize) -> Self {
        self.feeds_limit = Some(limit);
        self
    }

    /// Set the refresh period
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Set the idle window
    pub fn idle_window(mut self, window: Duration) -> Self {
        self.idle_window = Some(window);
        self
    }

    /// Set the failure window
    pub fn failure_window(mut self, window: Duration) -> Self {
        self.failure_window = Some(window);
        self
    }

    /// Set the counted element name
    pub fn item_element(mut self, name: impl Into<String>) -> Self {
        self.item_element = Some(name.into());
        self
    }

    /// Enable/disable idle eviction after failed refreshes
    pub fn evict_idle_while_failing(mut self, enable: bool) -> Self {
        self.evict_idle_while_failing = Some(enable);
        self
    }

    /// Set the 417 response body shape
    pub fn stale_response(mut self, response: StaleResponse) -> Self {
        self.stale_response = Some(response);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<MonitorConfig> {
        let defaults = MonitorConfig::default();
        let config = MonitorConfig {
            feeds_limit: self.feeds_limit.unwrap_or(defaults.feeds_limit),
            refresh_interval: self.refresh_interval.unwrap_or(defaults.refresh_interval),
            idle_window: self.idle_window.unwrap_or(defaults.idle_window),
            failure_window: self.failure_window.unwrap_or(defaults.failure_window),
            item_element: self.item_element.unwrap_or(defaults.item_element),
            evict_idle_while_failing: self
                .evict_idle_while_failing
                .unwrap_or(defaults.evict_idle_while_failing),
            stale_response: self.stale_response.unwrap_or(defaults.stale_response),
        };

        config.validate()?;
        Ok(config)
    }
}
