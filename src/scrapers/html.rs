//! HTML scraping adapters.
//!
//! [`HtmlAdapter`] scrapes a "most popular" page with a CSS selector and can
//! walk paginated listings. [`JsonHtmlAdapter`] handles endpoints that wrap
//! the HTML fragment in a JSON document.
//!
//! Each matched anchor becomes one candidate: its text is the title, its
//! `href` (resolved against the page URL) the link, and an `<img>` inside it
//! the image. Anchors without text or `href` are skipped. A first page on
//! which the selector matches nothing is treated as a parse failure, since
//! it usually means the site changed its markup.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::SourceError;
use crate::fetch::Fetch;
use crate::models::RawCandidate;
use crate::scrapers::distinct_links;

static PAGE_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"page=(\d+)").unwrap());
static ANY_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// Page walking strategy with its selector already parsed.
#[derive(Debug, Clone)]
pub enum PagePlan {
    Param {
        template: String,
        max_pages: Option<usize>,
    },
    NextLink {
        selector: Selector,
        max_pages: Option<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct HtmlAdapter {
    url: Url,
    selector: Selector,
    pagination: Option<PagePlan>,
}

/// What one scraped page yielded.
#[derive(Debug, Default)]
struct ScrapedPage {
    candidates: Vec<RawCandidate>,
    next: Option<Url>,
    last_page: usize,
}

impl HtmlAdapter {
    pub fn new(url: Url, selector: Selector, pagination: Option<PagePlan>) -> Self {
        Self {
            url,
            selector,
            pagination,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    pub async fn fetch_candidates<F: Fetch>(
        &self,
        fetcher: &F,
        limit: usize,
    ) -> Result<Vec<RawCandidate>, SourceError> {
        let results = match &self.pagination {
            None => self.fetch_page(fetcher, self.url.clone(), None).await?.candidates,
            Some(PagePlan::Param {
                template,
                max_pages,
            }) => {
                self.fetch_numbered(fetcher, template, *max_pages, limit)
                    .await?
            }
            Some(PagePlan::NextLink {
                selector,
                max_pages,
            }) => {
                self.fetch_following(fetcher, selector, *max_pages, limit)
                    .await?
            }
        };
        let mut results = distinct_links(results);
        results.truncate(limit);
        info!(count = results.len(), "Scraped candidates");
        Ok(results)
    }

    /// `?page=N` style listings: the first page tells how many pages exist.
    async fn fetch_numbered<F: Fetch>(
        &self,
        fetcher: &F,
        template: &str,
        max_pages: Option<usize>,
        limit: usize,
    ) -> Result<Vec<RawCandidate>, SourceError> {
        let first = self
            .fetch_page(fetcher, self.numbered_url(template, 1)?, None)
            .await?;
        let detected = first.last_page;
        let total = max_pages.map_or(detected, |cap| detected.min(cap));
        debug!(detected, total, "Detected page count");

        let mut results = distinct_links(first.candidates);
        for page in 2..=total {
            if results.len() >= limit {
                break;
            }
            let url = self.numbered_url(template, page)?;
            match self.fetch_page(fetcher, url, None).await {
                Ok(scraped) => {
                    results.extend(scraped.candidates);
                    results = distinct_links(results);
                }
                Err(e) => {
                    warn!(page, error = %e, "Stopping pagination early");
                    break;
                }
            }
        }
        Ok(results)
    }

    /// Listings with a "next" link: follow it until it disappears.
    async fn fetch_following<F: Fetch>(
        &self,
        fetcher: &F,
        next_selector: &Selector,
        max_pages: Option<usize>,
        limit: usize,
    ) -> Result<Vec<RawCandidate>, SourceError> {
        let cap = max_pages.unwrap_or(usize::MAX);
        let mut results = Vec::new();
        let mut next = Some(self.url.clone());
        let mut fetched = 0usize;

        while let Some(url) = next.take() {
            if fetched >= cap || results.len() >= limit {
                break;
            }
            let scraped = match self.fetch_page(fetcher, url, Some(next_selector)).await {
                Ok(scraped) => scraped,
                // a failing first page fails the source; later pages only stop the walk
                Err(e) if fetched == 0 => return Err(e),
                Err(e) => {
                    warn!(page = fetched + 1, error = %e, "Stopping pagination early");
                    break;
                }
            };
            fetched += 1;
            results.extend(scraped.candidates);
            results = distinct_links(results);
            next = scraped.next;
        }
        Ok(results)
    }

    async fn fetch_page<F: Fetch>(
        &self,
        fetcher: &F,
        url: Url,
        next_selector: Option<&Selector>,
    ) -> Result<ScrapedPage, SourceError> {
        let body = fetcher.fetch_text(url.as_str()).await?;
        let page = scrape_page(&body, &self.selector, &url, next_selector);
        if page.candidates.is_empty() {
            return Err(SourceError::Parse(format!(
                "selector matched no articles on {url}"
            )));
        }
        debug!(%url, count = page.candidates.len(), "Scraped page");
        Ok(page)
    }

    fn numbered_url(&self, template: &str, page: usize) -> Result<Url, SourceError> {
        let raw = format!("{}{}", self.url, template.replace("{page}", &page.to_string()));
        Url::parse(&raw).map_err(|e| SourceError::Parse(format!("bad page URL {raw}: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct JsonHtmlAdapter {
    url: Url,
    selector: Selector,
    json_key: String,
}

impl JsonHtmlAdapter {
    pub fn new(url: Url, selector: Selector, json_key: String) -> Self {
        Self {
            url,
            selector,
            json_key,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    #[instrument(level = "info", skip_all, fields(url = %self.url, key = %self.json_key))]
    pub async fn fetch_candidates<F: Fetch>(
        &self,
        fetcher: &F,
        limit: usize,
    ) -> Result<Vec<RawCandidate>, SourceError> {
        let body = fetcher.fetch_text(self.url.as_str()).await?;
        let html = html_from_json(&body, &self.json_key)?;
        let mut candidates =
            distinct_links(scrape_page(&html, &self.selector, &self.url, None).candidates);
        if candidates.is_empty() {
            return Err(SourceError::Parse(format!(
                "selector matched no articles in `{}`",
                self.json_key
            )));
        }
        candidates.truncate(limit);
        info!(count = candidates.len(), "Scraped candidates");
        Ok(candidates)
    }
}

fn html_from_json(body: &str, key: &str) -> Result<String, SourceError> {
    let json: serde_json::Value = serde_json::from_str(body)?;
    json.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| SourceError::Parse(format!("JSON field `{key}` missing or not a string")))
}

fn scrape_page(
    body: &str,
    selector: &Selector,
    base: &Url,
    next_selector: Option<&Selector>,
) -> ScrapedPage {
    let document = Html::parse_document(body);
    let candidates = document
        .select(selector)
        .filter_map(|a| anchor_candidate(a, base))
        .collect();
    let next = next_selector
        .and_then(|sel| document.select(sel).next())
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| base.join(href).ok());
    ScrapedPage {
        candidates,
        next,
        last_page: last_page_number(&document),
    }
}

fn anchor_candidate(anchor: ElementRef<'_>, base: &Url) -> Option<RawCandidate> {
    let href = anchor.value().attr("href")?;
    let link = base.join(href.trim()).ok()?;
    let text = anchor.text().collect::<Vec<_>>().join(" ");
    let title = if text.trim().is_empty() {
        anchor.value().attr("title")?.to_string()
    } else {
        text
    };
    let image_url = anchor.select(&IMG).next().and_then(|img| {
        let el = img.value();
        el.attr("src")
            .or_else(|| el.attr("data-src"))
            .and_then(|src| base.join(src).ok())
            .map(|u| u.to_string())
    });
    Some(RawCandidate {
        title: Some(title),
        link: Some(link.to_string()),
        preview: None,
        image_url,
    })
}

/// Highest `page=N` found in any link on the page, at least 1.
fn last_page_number(document: &Html) -> usize {
    document
        .select(&ANY_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| PAGE_PARAM.captures(href))
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .max()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn titles(c: &[RawCandidate]) -> Vec<String> {
        c.iter()
            .map(|c| c.title.clone().unwrap_or_default().trim().to_string())
            .collect()
    }

    const POPULAR: &str = r#"<html><body>
        <ul class="top10">
          <li><a href="/news/1">  Title  </a></li>
          <li><a href="https://other.gr/2"><img src="/img/2.jpg"> Second </a></li>
          <li><a href="/news/3"></a></li>
          <li><a>No href</a></li>
        </ul></body></html>"#;

    #[test]
    fn test_scrape_page_extracts_anchors() {
        let base = Url::parse("https://site.gr/popular/").unwrap();
        let page = scrape_page(POPULAR, &sel("ul.top10 li a"), &base, None);
        assert_eq!(page.candidates.len(), 2);
        assert_eq!(page.candidates[0].title.as_deref(), Some("  Title  "));
        assert_eq!(page.candidates[0].link.as_deref(), Some("https://site.gr/news/1"));
        assert_eq!(
            page.candidates[1].image_url.as_deref(),
            Some("https://site.gr/img/2.jpg")
        );
        assert_eq!(page.last_page, 1);
    }

    #[test]
    fn test_last_page_number() {
        let doc = Html::parse_document(
            r#"<a href="?page=2">2</a><a href="/list?page=7">7</a><a href="/x">x</a>"#,
        );
        assert_eq!(last_page_number(&doc), 7);
    }

    #[test]
    fn test_html_from_json() {
        let body = r#"{"popular": "<ul><li><a href='/a'>A</a></li></ul>"}"#;
        assert!(html_from_json(body, "popular").unwrap().contains("<ul>"));
        assert!(matches!(html_from_json(body, "html"), Err(SourceError::Parse(_))));
        assert!(matches!(html_from_json("not json", "popular"), Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_selector_drift_is_a_parse_failure() {
        let url = "https://site.gr/popular/";
        let fetcher = StaticFetcher::new().page(url, "<html><body><p>redesigned</p></body></html>");
        let adapter = HtmlAdapter::new(Url::parse(url).unwrap(), sel("ul.top10 li a"), None);
        let res = adapter.fetch_candidates(&fetcher, 5).await;
        assert!(matches!(res, Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_param_pagination_respects_max_pages() {
        let base = "https://site.gr/popular/";
        let page = |n: usize| {
            format!(
                r#"<ul class="l"><li><a href="/p{n}">Article {n}</a></li></ul>
                   <a href="?page=1">1</a><a href="?page=2">2</a><a href="?page=3">3</a><a href="?page=4">4</a>"#
            )
        };
        let fetcher = StaticFetcher::new()
            .page("https://site.gr/popular/?page=1", &page(1))
            .page("https://site.gr/popular/?page=2", &page(2))
            .page("https://site.gr/popular/?page=3", &page(3))
            .page("https://site.gr/popular/?page=4", &page(4));
        let adapter = HtmlAdapter::new(
            Url::parse(base).unwrap(),
            sel("ul.l li a"),
            Some(PagePlan::Param {
                template: "?page={page}".into(),
                max_pages: Some(3),
            }),
        );
        let items = adapter.fetch_candidates(&fetcher, 10).await.unwrap();
        assert_eq!(titles(&items), vec!["Article 1", "Article 2", "Article 3"]);
        assert_eq!(fetcher.request_count("https://site.gr/popular/?page=4"), 0);
    }

    #[tokio::test]
    async fn test_next_link_pagination_stops_at_limit() {
        let fetcher = StaticFetcher::new()
            .page(
                "https://site.gr/most-read/",
                r#"<div class="l"><a href="/1">One</a><a href="/2">Two</a></div><a class="next" href="/most-read/2">next</a>"#,
            )
            .page(
                "https://site.gr/most-read/2",
                r#"<div class="l"><a href="/3">Three</a></div><a class="next" href="/most-read/3">next</a>"#,
            );
        let adapter = HtmlAdapter::new(
            Url::parse("https://site.gr/most-read/").unwrap(),
            sel("div.l a"),
            Some(PagePlan::NextLink {
                selector: sel("a.next"),
                max_pages: None,
            }),
        );
        let items = adapter.fetch_candidates(&fetcher, 3).await.unwrap();
        assert_eq!(titles(&items), vec!["One", "Two", "Three"]);
        // limit reached, page 3 is never requested
        assert_eq!(fetcher.request_count("https://site.gr/most-read/3"), 0);
    }

    #[tokio::test]
    async fn test_repeated_links_do_not_use_up_the_limit() {
        let url = "https://site.gr/popular/";
        let fetcher = StaticFetcher::new().page(
            url,
            r#"<section class="popular">
                 <article><a href="/1"><img src="/1.jpg"> One</a><a href="/1">One</a></article>
                 <article><a href="/2"><img src="/2.jpg"> Two</a><a href="/2">Two</a></article>
                 <article><a href="/3">Three</a></article>
               </section>"#,
        );
        let adapter = HtmlAdapter::new(Url::parse(url).unwrap(), sel("section.popular article a"), None);
        let items = adapter.fetch_candidates(&fetcher, 2).await.unwrap();
        assert_eq!(titles(&items), vec!["One", "Two"]);
        assert_eq!(items[1].image_url.as_deref(), Some("https://site.gr/2.jpg"));
    }

    #[tokio::test]
    async fn test_next_link_pagination_counts_distinct_links() {
        let fetcher = StaticFetcher::new()
            .page(
                "https://site.gr/most-read/",
                r#"<div class="l"><a href="/1">One</a><a href="/1">One</a></div><a class="next" href="/most-read/2">next</a>"#,
            )
            .page(
                "https://site.gr/most-read/2",
                r#"<div class="l"><a href="/2">Two</a></div>"#,
            );
        let adapter = HtmlAdapter::new(
            Url::parse("https://site.gr/most-read/").unwrap(),
            sel("div.l a"),
            Some(PagePlan::NextLink {
                selector: sel("a.next"),
                max_pages: None,
            }),
        );
        let items = adapter.fetch_candidates(&fetcher, 2).await.unwrap();
        assert_eq!(titles(&items), vec!["One", "Two"]);
    }

    #[tokio::test]
    async fn test_json_html_adapter() {
        let url = "https://site.gr/popular.txt";
        let body = r#"{"popular": "<ul class=\"list\"><li><a href=\"/a\">A</a></li><li><a href=\"/b\">B</a></li></ul>"}"#;
        let fetcher = StaticFetcher::new().page(url, body);
        let adapter = JsonHtmlAdapter::new(Url::parse(url).unwrap(), sel("ul.list li a"), "popular".into());
        let items = adapter.fetch_candidates(&fetcher, 1).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link.as_deref(), Some("https://site.gr/a"));
    }
}
