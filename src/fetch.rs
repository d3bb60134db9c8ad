//! HTTP transport with exponential backoff retry logic.
//!
//! Adapters never talk to reqwest directly. They go through the [`Fetch`]
//! capability so tests can substitute canned pages and so retries can be
//! layered on as a decorator.
//!
//! - [`Fetch`]: fetch a URL and return its body as text
//! - [`HttpFetcher`]: the reqwest-backed implementation
//! - [`RetryFetch`]: decorator that retries transient failures
//!
//! # Retry Strategy
//!
//! - Only transient errors ([`SourceError::is_transient`]) are retried
//! - Exponential backoff starting at `base_delay`, capped at `max_delay`
//! - Random jitter (0-250ms) added to every delay

use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

use crate::config::AggregatorConfig;
use crate::error::SourceError;

/// Fetch the body of a URL as text.
pub trait Fetch: Send + Sync {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, SourceError>> + Send;
}

/// Plain reqwest client with a fixed user agent and request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`]
/// implementation.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: Fetch> RetryFetch<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(5),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Fetch> Fetch for RetryFetch<T> {
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch_text(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            %url,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        %url,
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Build the production transport for a configuration.
pub fn http_fetcher(config: &AggregatorConfig) -> Result<RetryFetch<HttpFetcher>, SourceError> {
    let http = HttpFetcher::new(&config.user_agent, config.request_timeout())?;
    Ok(RetryFetch::new(
        http,
        config.max_retries,
        Duration::from_millis(500),
    ))
}
