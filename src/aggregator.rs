//! Runs every configured source and merges the results.
//!
//! The aggregator is built once from an explicit [`AggregatorConfig`] and a
//! [`Fetch`] transport, and then serves any number of [`Aggregator::aggregate`]
//! calls. Each call:
//!
//! 1. Fetches all sources concurrently, each listing bounded by the source
//!    timeout
//! 2. Optionally enriches candidates with previews from the article pages,
//!    under a separate timeout that never fails the source
//! 3. Normalizes, deduplicates and caps each source at `n` records
//! 4. Returns one slot per source in configuration order
//!
//! A source that fails or times out gets an empty slot and a recorded
//! failure; it never aborts the run.

use futures::future::join_all;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::{AggregatorConfig, Limit};
use crate::error::{ConfigError, SourceError};
use crate::fetch::Fetch;
use crate::models::{AggregationResult, RawCandidate, SourceResult};
use crate::normalize::Normalizer;
use crate::scrapers::{SourceAdapter, preview};

pub struct Aggregator<F> {
    config: AggregatorConfig,
    sources: Vec<SourceAdapter>,
    fetcher: F,
    normalizer: Normalizer,
    source_timeout: Duration,
}

impl<F: Fetch> Aggregator<F> {
    /// Validate the configuration and prepare one adapter set per source.
    pub fn new(config: AggregatorConfig, fetcher: F) -> Result<Self, ConfigError> {
        config.validate()?;
        let sources = config
            .sources
            .iter()
            .map(SourceAdapter::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            normalizer: Normalizer::new(config.preview_max_chars),
            source_timeout: config.source_timeout(),
            sources,
            fetcher,
            config,
        })
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// The limit for a requested item count; `None` means the configured default.
    pub fn resolve_limit(&self, n: Option<i64>) -> Result<Limit, ConfigError> {
        match n {
            Some(n) => Limit::new(n),
            None => Ok(self.config.default_limit()),
        }
    }

    #[instrument(level = "info", skip_all, fields(limit = limit.get(), sources = self.sources.len()))]
    pub async fn aggregate(&self, limit: Limit) -> AggregationResult {
        let t0 = Instant::now();
        let n = limit.get();

        let sources = join_all(self.sources.iter().map(|s| self.run_source(s, n))).await;

        let result = AggregationResult { limit: n, sources };
        info!(
            articles = result.total_articles(),
            failed = result.failed_sources(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Aggregation complete"
        );
        result
    }

    async fn run_source(&self, source: &SourceAdapter, n: usize) -> SourceResult {
        let t0 = Instant::now();
        let listing = tokio::time::timeout(self.source_timeout, source.fetch(&self.fetcher, n))
            .await
            .unwrap_or(Err(SourceError::Timeout(self.source_timeout)));

        match listing {
            Ok(candidates) => {
                let candidates = self.enrich(source, candidates).await;
                let articles = self.normalizer.normalize_all(candidates, source.name(), n);
                info!(
                    source = source.name(),
                    count = articles.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Source done"
                );
                SourceResult::ok(source.name(), articles)
            }
            Err(e) => {
                warn!(
                    source = source.name(),
                    error = %e,
                    "Source failed; continuing with an empty list"
                );
                SourceResult::failed(source.name(), &e)
            }
        }
    }

    /// Preview enrichment gets its own time budget; when it runs out the
    /// listing is kept as fetched.
    async fn enrich(
        &self,
        source: &SourceAdapter,
        candidates: Vec<RawCandidate>,
    ) -> Vec<RawCandidate> {
        if !self.config.fetch_previews {
            return candidates;
        }
        match tokio::time::timeout(
            self.source_timeout,
            preview::enrich(&self.fetcher, candidates.clone()),
        )
        .await
        {
            Ok(enriched) => enriched,
            Err(_) => {
                debug!(
                    source = source.name(),
                    timeout = ?self.source_timeout,
                    "Preview enrichment timed out; keeping the listing as is"
                );
                candidates
            }
        }
    }
}
