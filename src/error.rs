//! Error types for source fetching and configuration.
//!
//! Two classes of failure exist:
//!
//! - [`SourceError`]: a transient problem with one news site (network, HTTP
//!   status, markup drift, timeout). It is always recovered per source and
//!   reported as a [`SourceFailure`](crate::models::SourceFailure).
//! - [`ConfigError`]: a mistake in the configuration or in the requested
//!   item count. This is the only class surfaced to the user as a failure.

use thiserror::Error;

/// Failure while fetching or parsing a single source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure: DNS, connection, TLS, request timeout.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The feed or page did not have the expected structure.
    #[error("parse failure: {0}")]
    Parse(String),

    /// The source did not answer within the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl SourceError {
    /// Whether retrying the same request may succeed. Client errors other
    /// than 408 and 429 are final.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Unavailable(_) | SourceError::Timeout(_) => true,
            SourceError::Status { status, .. } => {
                matches!(status, 408 | 429) || !(400..500).contains(status)
            }
            SourceError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Unavailable(format!("request timed out: {e}"))
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(format!("invalid JSON: {e}"))
    }
}

/// Invalid configuration or input.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("source `{0}` defines neither an RSS feed nor a scrape rule")]
    NoStrategy(String),

    #[error("source at position {0} has an empty name")]
    EmptyName(usize),

    #[error("source `{source_name}` has an invalid selector `{selector}`")]
    InvalidSelector {
        source_name: String,
        selector: String,
    },

    #[error("source `{source_name}` has an invalid URL `{url}`")]
    InvalidUrl { source_name: String, url: String },

    #[error("item count must be a positive integer, got {0}")]
    InvalidLimit(i64),

    #[error("`{0}` must be greater than zero")]
    ZeroSetting(&'static str),

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
