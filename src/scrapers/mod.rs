//! Source adapters: one way of reading a site's "most viewed" list each.
//!
//! # Variants
//!
//! | Variant | Module | Input |
//! |---------|--------|-------|
//! | [`Adapter::Rss`] | [`rss`] | RSS 2.0 / RSS 1.0 / Atom feed |
//! | [`Adapter::Html`] | [`html`] | HTML page + CSS selector, optional pagination |
//! | [`Adapter::JsonHtml`] | [`html`] | JSON document with an HTML field |
//!
//! A [`SourceAdapter`] holds the variants a [`SourceSpec`] enables, in
//! preference order: the feed first, then the scrape rule. The next variant
//! is tried when one fails or yields nothing.
//!
//! Site-specific selectors live only in configuration, so a site redesign
//! touches that source's entry and nothing else.

pub mod html;
pub mod preview;
pub mod rss;

use itertools::Itertools;
use scraper::Selector;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::{Pagination, ScrapeRule, SourceSpec};
use crate::error::{ConfigError, SourceError};
use crate::fetch::Fetch;
use crate::models::RawCandidate;
use html::{HtmlAdapter, JsonHtmlAdapter, PagePlan};
use rss::RssAdapter;

#[derive(Debug, Clone)]
pub enum Adapter {
    Rss(RssAdapter),
    Html(HtmlAdapter),
    JsonHtml(JsonHtmlAdapter),
}

impl Adapter {
    pub fn kind(&self) -> &'static str {
        match self {
            Adapter::Rss(_) => "rss",
            Adapter::Html(_) => "html",
            Adapter::JsonHtml(_) => "json_html",
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            Adapter::Rss(a) => a.url(),
            Adapter::Html(a) => a.url(),
            Adapter::JsonHtml(a) => a.url(),
        }
    }

    /// Fetch at most `limit` candidates.
    pub async fn fetch_candidates<F: Fetch>(
        &self,
        fetcher: &F,
        limit: usize,
    ) -> Result<Vec<RawCandidate>, SourceError> {
        match self {
            Adapter::Rss(a) => a.fetch_candidates(fetcher, limit).await,
            Adapter::Html(a) => a.fetch_candidates(fetcher, limit).await,
            Adapter::JsonHtml(a) => a.fetch_candidates(fetcher, limit).await,
        }
    }
}

/// The adapters of one configured source.
#[derive(Debug, Clone)]
pub struct SourceAdapter {
    name: String,
    adapters: Vec<Adapter>,
}

impl SourceAdapter {
    /// Build the adapters for a spec, parsing URLs and selectors up front.
    pub fn from_spec(spec: &SourceSpec) -> Result<Self, ConfigError> {
        let mut adapters = Vec::new();
        if let Some(feed) = &spec.rss {
            adapters.push(Adapter::Rss(RssAdapter::new(parse_url(spec, &feed.url)?)));
        }
        if let Some(rule) = &spec.scrape {
            adapters.push(scrape_adapter(spec, rule)?);
        }
        if adapters.is_empty() {
            return Err(ConfigError::NoStrategy(spec.name.clone()));
        }
        Ok(Self {
            name: spec.name.clone(),
            adapters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    /// Try each adapter in order and return the first non-empty result.
    ///
    /// When every adapter fails the last error is returned; when they all
    /// succeed with nothing, the result is empty.
    #[instrument(level = "info", skip_all, fields(source = %self.name))]
    pub async fn fetch<F: Fetch>(
        &self,
        fetcher: &F,
        limit: usize,
    ) -> Result<Vec<RawCandidate>, SourceError> {
        let mut last_error = None;
        for adapter in &self.adapters {
            match adapter.fetch_candidates(fetcher, limit).await {
                Ok(candidates) if !candidates.is_empty() => {
                    info!(
                        adapter = adapter.kind(),
                        count = candidates.len(),
                        "Fetched candidates"
                    );
                    return Ok(candidates);
                }
                Ok(_) => {
                    warn!(adapter = adapter.kind(), url = %adapter.url(), "Adapter returned no items");
                }
                Err(e) => {
                    warn!(adapter = adapter.kind(), url = %adapter.url(), error = %e, "Adapter failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

/// Drop candidates with a blank title or link, and repeated links (first
/// occurrence wins), so that cutting to `n` afterwards keeps `n` articles.
pub(crate) fn distinct_links(candidates: Vec<RawCandidate>) -> Vec<RawCandidate> {
    candidates
        .into_iter()
        .filter(|c| has_text(&c.title) && has_text(&c.link))
        .unique_by(|c| c.link.as_deref().map(str::trim).unwrap_or_default().to_string())
        .collect()
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn scrape_adapter(spec: &SourceSpec, rule: &ScrapeRule) -> Result<Adapter, ConfigError> {
    let url = parse_url(spec, &rule.url)?;
    let selector = parse_selector(spec, &rule.selector)?;
    if let Some(key) = &rule.json_key {
        return Ok(Adapter::JsonHtml(JsonHtmlAdapter::new(url, selector, key.clone())));
    }
    let pagination = match &rule.pagination {
        None => None,
        Some(Pagination::Param {
            template,
            max_pages,
        }) => Some(PagePlan::Param {
            template: template.clone(),
            max_pages: *max_pages,
        }),
        Some(Pagination::NextLink {
            selector,
            max_pages,
        }) => Some(PagePlan::NextLink {
            selector: parse_selector(spec, selector)?,
            max_pages: *max_pages,
        }),
    };
    Ok(Adapter::Html(HtmlAdapter::new(url, selector, pagination)))
}

fn parse_url(spec: &SourceSpec, url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|_| ConfigError::InvalidUrl {
        source_name: spec.name.clone(),
        url: url.to_string(),
    })
}

fn parse_selector(spec: &SourceSpec, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        source_name: spec.name.clone(),
        selector: selector.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    const FEED_URL: &str = "https://site.gr/rss";
    const PAGE_URL: &str = "https://site.gr/popular/";

    fn spec() -> SourceSpec {
        SourceSpec::rss("Site", FEED_URL).with_scrape(ScrapeRule {
            url: PAGE_URL.into(),
            selector: "ul li a".into(),
            json_key: None,
            pagination: None,
        })
    }

    const PAGE: &str = r#"<ul><li><a href="/x">Scraped</a></li></ul>"#;

    fn candidate(title: &str, link: &str) -> RawCandidate {
        RawCandidate {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            ..RawCandidate::default()
        }
    }

    #[test]
    fn test_distinct_links_keeps_first_occurrence() {
        let items = distinct_links(vec![
            candidate("One", "https://a.gr/1"),
            candidate("One (photo)", " https://a.gr/1 "),
            candidate("  ", "https://a.gr/blank"),
            candidate("Two", ""),
            candidate("Three", "https://a.gr/3"),
        ]);
        let titles: Vec<_> = items.iter().filter_map(|c| c.title.as_deref()).collect();
        assert_eq!(titles, vec!["One", "Three"]);
    }

    #[test]
    fn test_feed_is_preferred() {
        let adapter = SourceAdapter::from_spec(&spec()).unwrap();
        let kinds: Vec<_> = adapter.adapters().iter().map(Adapter::kind).collect();
        assert_eq!(kinds, vec!["rss", "html"]);
    }

    #[test]
    fn test_json_key_selects_json_html() {
        let mut spec = spec();
        spec.rss = None;
        if let Some(rule) = spec.scrape.as_mut() {
            rule.json_key = Some("popular".into());
        }
        let adapter = SourceAdapter::from_spec(&spec).unwrap();
        assert_eq!(adapter.adapters()[0].kind(), "json_html");
    }

    #[test]
    fn test_spec_without_strategy_is_rejected() {
        let spec = SourceSpec {
            name: "None".into(),
            rss: None,
            scrape: None,
        };
        assert!(matches!(
            SourceAdapter::from_spec(&spec),
            Err(ConfigError::NoStrategy(_))
        ));
    }

    #[tokio::test]
    async fn test_falls_back_to_scrape_when_feed_is_down() {
        let fetcher = StaticFetcher::new().page(PAGE_URL, PAGE);
        let adapter = SourceAdapter::from_spec(&spec()).unwrap();
        let items = adapter.fetch(&fetcher, 5).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Scraped"));
    }

    #[tokio::test]
    async fn test_falls_back_when_feed_is_not_xml() {
        let fetcher = StaticFetcher::new()
            .page(FEED_URL, "<html>error page</html>")
            .page(PAGE_URL, PAGE);
        let adapter = SourceAdapter::from_spec(&spec()).unwrap();
        let items = adapter.fetch(&fetcher, 5).await.unwrap();
        assert_eq!(items[0].link.as_deref(), Some("https://site.gr/x"));
    }

    #[tokio::test]
    async fn test_falls_back_when_feed_is_empty() {
        let fetcher = StaticFetcher::new()
            .page(FEED_URL, r#"<rss version="2.0"><channel><title>t</title></channel></rss>"#)
            .page(PAGE_URL, PAGE);
        let adapter = SourceAdapter::from_spec(&spec()).unwrap();
        let items = adapter.fetch(&fetcher, 5).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_all_adapters_failing_returns_last_error() {
        let fetcher = StaticFetcher::new().page(PAGE_URL, "<p>nothing here</p>");
        let adapter = SourceAdapter::from_spec(&spec()).unwrap();
        let res = adapter.fetch(&fetcher, 5).await;
        assert!(matches!(res, Err(SourceError::Parse(_))));
    }
}
