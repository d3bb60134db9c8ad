//! Data models shared by the adapters, the aggregator and the presenters.
//!
//! - [`RawCandidate`]: an unvalidated item as a feed or page exposes it
//! - [`ArticleRecord`]: a normalized article, always with title and link
//! - [`SourceResult`] / [`AggregationResult`]: the per-run output, in
//!   configuration order
//!
//! Everything here is built fresh for each aggregation run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SourceError;

/// An item as found in an RSS feed or a scraped page, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: Option<String>,
    pub link: Option<String>,
    pub preview: Option<String>,
    pub image_url: Option<String>,
}

/// A normalized article.
///
/// `title` and `link` are never empty; the normalizer discards candidates
/// that would violate this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub source: String,
}

/// Why a source produced no articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unavailable,
    Parse,
    Timeout,
}

/// A recovered per-source failure, kept next to the (empty) result so the
/// presenters can say why a source is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&SourceError> for SourceFailure {
    fn from(e: &SourceError) -> Self {
        let kind = match e {
            SourceError::Unavailable(_) | SourceError::Status { .. } => FailureKind::Unavailable,
            SourceError::Parse(_) => FailureKind::Parse,
            SourceError::Timeout(_) => FailureKind::Timeout,
        };
        SourceFailure {
            kind,
            message: e.to_string(),
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Articles collected for one configured source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: String,
    pub articles: Vec<ArticleRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SourceFailure>,
}

impl SourceResult {
    pub fn ok(source: impl Into<String>, articles: Vec<ArticleRecord>) -> Self {
        Self {
            source: source.into(),
            articles,
            failure: None,
        }
    }

    pub fn failed(source: impl Into<String>, error: &SourceError) -> Self {
        Self {
            source: source.into(),
            articles: Vec::new(),
            failure: Some(error.into()),
        }
    }
}

/// The output of one aggregation run.
///
/// Holds one entry per configured source, in configuration order, even for
/// sources that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// The per-source cap used for this run.
    pub limit: usize,
    pub sources: Vec<SourceResult>,
}

impl AggregationResult {
    pub fn total_articles(&self) -> usize {
        self.sources.iter().map(|s| s.articles.len()).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.failure.is_some()).count()
    }

    /// Look up the articles of a source by name.
    pub fn get(&self, source: &str) -> Option<&[ArticleRecord]> {
        self.sources
            .iter()
            .find(|s| s.source == source)
            .map(|s| s.articles.as_slice())
    }
}
