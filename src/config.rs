//! Static configuration: the list of news sources and tuning knobs.
//!
//! Configuration is loaded once at startup, either from the built-in Greek
//! source list ([`AggregatorConfig::default`]) or from a YAML file, and then
//! handed to the [`Aggregator`](crate::aggregator::Aggregator). It is never
//! mutated afterwards.
//!
//! # YAML shape
//!
//! ```yaml
//! default_limit: 10
//! sources:
//!   - name: Proto Thema
//!     rss:
//!       url: https://www.protothema.gr/rss/
//!     scrape:
//!       url: https://www.protothema.gr/most-read/
//!       selector: div.article-list article h2 a
//!       pagination:
//!         type: next_link
//!         selector: a.next
//!         max_pages: 5
//! ```

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use crate::error::ConfigError;

/// Items per source when the caller does not ask for a specific count.
pub const DEFAULT_LIMIT: usize = 10;
/// Maximum preview length, in characters.
pub const DEFAULT_PREVIEW_MAX_CHARS: usize = 200;

/// An RSS or Atom feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssFeed {
    pub url: String,
}

/// How to walk past the first page of a scraped listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pagination {
    /// Append `template` (with `{page}` substituted) to the page URL. The page
    /// count is detected from `page=N` links on the first page.
    Param {
        template: String,
        #[serde(default)]
        max_pages: Option<usize>,
    },
    /// Follow the anchor matched by `selector` until it disappears.
    NextLink {
        selector: String,
        #[serde(default)]
        max_pages: Option<usize>,
    },
}

/// A page to scrape and the CSS selector picking its article anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRule {
    pub url: String,
    pub selector: String,
    /// When set, the response is JSON and this field holds the HTML.
    #[serde(default)]
    pub json_key: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// One news site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    #[serde(default)]
    pub rss: Option<RssFeed>,
    #[serde(default)]
    pub scrape: Option<ScrapeRule>,
}

impl SourceSpec {
    pub fn rss(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            rss: Some(RssFeed {
                url: url.to_string(),
            }),
            scrape: None,
        }
    }

    pub fn html(name: &str, url: &str, selector: &str) -> Self {
        Self {
            name: name.to_string(),
            rss: None,
            scrape: Some(ScrapeRule {
                url: url.to_string(),
                selector: selector.to_string(),
                json_key: None,
                pagination: None,
            }),
        }
    }

    pub fn with_scrape(mut self, rule: ScrapeRule) -> Self {
        self.scrape = Some(rule);
        self
    }

    fn validate(&self, position: usize) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName(position));
        }
        if self.rss.is_none() && self.scrape.is_none() {
            return Err(ConfigError::NoStrategy(self.name.clone()));
        }
        if let Some(rss) = &self.rss {
            self.check_url(&rss.url)?;
        }
        if let Some(rule) = &self.scrape {
            self.check_url(&rule.url)?;
            self.check_selector(&rule.selector)?;
            if let Some(Pagination::NextLink { selector, .. }) = &rule.pagination {
                self.check_selector(selector)?;
            }
        }
        Ok(())
    }

    fn check_url(&self, url: &str) -> Result<(), ConfigError> {
        Url::parse(url).map(|_| ()).map_err(|_| ConfigError::InvalidUrl {
            source_name: self.name.clone(),
            url: url.to_string(),
        })
    }

    fn check_selector(&self, selector: &str) -> Result<(), ConfigError> {
        Selector::parse(selector)
            .map(|_| ())
            .map_err(|_| ConfigError::InvalidSelector {
                source_name: self.name.clone(),
                selector: selector.to_string(),
            })
    }
}

/// A validated, strictly positive number of items per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(usize);

impl Limit {
    pub fn new(n: i64) -> Result<Self, ConfigError> {
        if n <= 0 {
            return Err(ConfigError::InvalidLimit(n));
        }
        usize::try_from(n)
            .map(Limit)
            .map_err(|_| ConfigError::InvalidLimit(n))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Everything the aggregator needs to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub sources: Vec<SourceSpec>,
    pub default_limit: usize,
    pub preview_max_chars: usize,
    /// Wall-clock bound for one source, all its requests included.
    pub source_timeout_secs: u64,
    /// Bound for a single HTTP request.
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    /// Visit article pages to fill in missing previews and images.
    pub fetch_previews: bool,
    pub user_agent: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sources: greek_sources(),
            default_limit: DEFAULT_LIMIT,
            preview_max_chars: DEFAULT_PREVIEW_MAX_CHARS,
            source_timeout_secs: 15,
            request_timeout_secs: 10,
            max_retries: 2,
            fetch_previews: false,
            user_agent: format!("NewsAgg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AggregatorConfig {
    /// Load a YAML config file. Missing fields take their default values.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&raw)?;
        info!(sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: AggregatorConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_limit == 0 {
            return Err(ConfigError::InvalidLimit(0));
        }
        let positive = [
            ("preview_max_chars", self.preview_max_chars as u64),
            ("source_timeout_secs", self.source_timeout_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        if let Some((field, _)) = positive.into_iter().find(|&(_, value)| value == 0) {
            return Err(ConfigError::ZeroSetting(field));
        }
        for (i, source) in self.sources.iter().enumerate() {
            source.validate(i)?;
        }
        Ok(())
    }

    /// The limit used when the caller gives none.
    pub fn default_limit(&self) -> Limit {
        Limit(self.default_limit.max(1))
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Built-in list of Greek news sites.
///
/// Feeds come first; the scrape rules point at each site's "most popular"
/// page and are only used when the feed fails.
pub fn greek_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec {
            name: "Kathimerini".into(),
            rss: None,
            scrape: Some(ScrapeRule {
                url: "https://www.kathimerini.gr/infeeds/popular/popular_html.txt".into(),
                selector: "ul.nx-dhmofilh__list li a".into(),
                json_key: Some("popular".into()),
                pagination: None,
            }),
        },
        SourceSpec::rss("Proto Thema", "https://www.protothema.gr/rss/").with_scrape(ScrapeRule {
            url: "https://www.protothema.gr/most-read/".into(),
            selector: "div.article-list article h2 a".into(),
            json_key: None,
            pagination: Some(Pagination::NextLink {
                selector: "a.next".into(),
                max_pages: Some(5),
            }),
        }),
        SourceSpec::rss("In.gr", "https://www.in.gr/feed").with_scrape(ScrapeRule {
            url: "https://www.in.gr/most-viewed/".into(),
            selector: "div.mostread-list li a".into(),
            json_key: None,
            pagination: Some(Pagination::Param {
                template: "?page={page}".into(),
                max_pages: Some(3),
            }),
        }),
        SourceSpec::html(
            "News247",
            "https://www.news247.gr",
            "section.popular_articles_section article a",
        ),
        SourceSpec::rss("SKAI", "https://www.skai.gr/feed.xml"),
        SourceSpec::rss("Naftemporiki", "https://www.naftemporiki.gr/feed/"),
        SourceSpec::rss("To Vima", "https://www.tovima.gr/feed").with_scrape(ScrapeRule {
            url: "https://www.tovima.gr/most-read/".into(),
            selector: "section.popular-posts a.post-title".into(),
            json_key: None,
            pagination: None,
        }),
        SourceSpec::rss("Ethnos", "https://www.ethnos.gr/rss"),
        SourceSpec::rss("Zougla", "https://www.zougla.gr/feed/"),
        SourceSpec::rss("NewsIT", "https://www.newsit.gr/feed/"),
    ]
}
