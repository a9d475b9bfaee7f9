//! Unified error handling for the feedwatch crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while maintaining the
//! ability to use domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for logs and operators
//! - [`Error`] - Unified error enum wrapping the domain-specific errors
//!
//! Refresh failures never leave the worker that hit them; they are logged
//! with their category and recorded as the feed's failing streak. Admission
//! outcomes are lookup results, not errors, and never reach this type.

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::feed::{CountError, StatError};
pub use crate::monitor::RefreshError;
pub use crate::utils::error::{ArchiveError, FetchError};

/// Classification of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport failures: fetch errors, non-success upstream status
    Network,
    /// Stat body without a size marker, broken gzip or XML
    Format,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Format => "format",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the feedwatch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Stat probe errors
    #[error("Stat error: {0}")]
    Stat(#[from] StatError),

    /// Archive count errors
    #[error("Count error: {0}")]
    Count(#[from] CountError),

    /// Refresh errors
    #[error("Refresh error: {0}")]
    Refresh(#[from] RefreshError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Stat(e) => stat_category(e),
            Self::Count(e) => count_category(e),
            Self::Refresh(RefreshError::Unreachable(e)) => stat_category(e),
            Self::Refresh(RefreshError::Decode(e)) => count_category(e),
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

fn stat_category(err: &StatError) -> ErrorCategory {
    match err {
        StatError::Fetch(_) => ErrorCategory::Network,
        StatError::MissingSizeMarker => ErrorCategory::Format,
    }
}

fn count_category(err: &CountError) -> ErrorCategory {
    match err {
        CountError::Fetch(_) => ErrorCategory::Network,
        CountError::Decode(_) => ErrorCategory::Format,
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
