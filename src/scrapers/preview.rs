//! Fill in missing previews and images from the article pages themselves.
//!
//! Scraped listings only carry a title and a link. When enabled, each
//! candidate lacking a preview or an image gets its article page fetched and
//! the `<meta name="description">` (or the first paragraph) and `og:image`
//! read from it. Failures leave the candidate as it was.

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::fetch::Fetch;
use crate::models::RawCandidate;

const PREVIEW_CONCURRENCY: usize = 4;

static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#).unwrap()
});
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Enrich candidates in place order, a few pages at a time.
#[instrument(level = "info", skip_all, fields(count = candidates.len()))]
pub async fn enrich<F: Fetch>(fetcher: &F, candidates: Vec<RawCandidate>) -> Vec<RawCandidate> {
    stream::iter(candidates)
        .map(|mut candidate| async move {
            if candidate.preview.is_some() && candidate.image_url.is_some() {
                return candidate;
            }
            let Some(link) = candidate.link.clone() else {
                return candidate;
            };
            match fetcher.fetch_text(&link).await {
                Ok(body) => {
                    let meta = extract_page_meta(&body, Url::parse(&link).ok().as_ref());
                    if candidate.preview.is_none() {
                        candidate.preview = meta.description;
                    }
                    if candidate.image_url.is_none() {
                        candidate.image_url = meta.image;
                    }
                }
                Err(e) => debug!(%link, error = %e, "Preview fetch failed"),
            }
            candidate
        })
        .buffered(PREVIEW_CONCURRENCY)
        .collect()
        .await
}

/// Description and image of an article page. A relative `og:image` is
/// resolved against `base` when given.
pub fn extract_page_meta(body: &str, base: Option<&Url>) -> PageMeta {
    let document = Html::parse_document(body);

    let description = document
        .select(&META_DESCRIPTION)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| {
            document
                .select(&PARAGRAPH)
                .map(|p| p.text().collect::<String>().trim().to_string())
                .find(|t| !t.is_empty())
        });

    let image = document
        .select(&OG_IMAGE)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(|src| match base.and_then(|b| b.join(src).ok()) {
            Some(abs) => abs.to_string(),
            None => src.to_string(),
        });

    PageMeta { description, image }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    #[test]
    fn test_meta_description_preferred() {
        let html = r#"<html><head>
            <meta name="description" content=" Σύντομη περιγραφή ">
            <meta property="og:image" content="/img/cover.jpg">
            </head><body><p>First paragraph</p></body></html>"#;
        let base = Url::parse("https://site.gr/a/1").unwrap();
        let meta = extract_page_meta(html, Some(&base));
        assert_eq!(meta.description.as_deref(), Some("Σύντομη περιγραφή"));
        assert_eq!(meta.image.as_deref(), Some("https://site.gr/img/cover.jpg"));
    }

    #[test]
    fn test_first_paragraph_fallback() {
        let html = "<html><body><p> </p><p>Real text</p></body></html>";
        let meta = extract_page_meta(html, None);
        assert_eq!(meta.description.as_deref(), Some("Real text"));
        assert_eq!(meta.image, None);
    }

    #[tokio::test]
    async fn test_enrich_keeps_order_and_ignores_failures() {
        let fetcher = StaticFetcher::new().page(
            "https://site.gr/a/1",
            r#"<meta name="description" content="Preview one">"#,
        );
        let candidates = vec![
            RawCandidate {
                title: Some("One".into()),
                link: Some("https://site.gr/a/1".into()),
                ..RawCandidate::default()
            },
            RawCandidate {
                title: Some("Two".into()),
                link: Some("https://site.gr/a/2".into()),
                ..RawCandidate::default()
            },
        ];
        let enriched = enrich(&fetcher, candidates).await;
        assert_eq!(enriched[0].preview.as_deref(), Some("Preview one"));
        assert_eq!(enriched[1].title.as_deref(), Some("Two"));
        assert_eq!(enriched[1].preview, None);
    }
}
