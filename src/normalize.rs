//! Turns raw candidates into [`ArticleRecord`]s.
//!
//! Rules:
//! - title and link are trimmed (title whitespace is collapsed); a candidate
//!   with an empty title or link is dropped
//! - previews lose their HTML markup, are collapsed and cut to the configured
//!   length; an empty preview becomes `None`
//! - image URLs survive only as absolute `http`/`https` URLs
//! - within one source the first occurrence of a link wins

use itertools::Itertools;
use scraper::Html;
use tracing::trace;
use url::Url;

use crate::models::{ArticleRecord, RawCandidate};
use crate::utils::{collapse_whitespace, truncate_chars};

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    preview_max_chars: usize,
}

impl Normalizer {
    pub fn new(preview_max_chars: usize) -> Self {
        Self { preview_max_chars }
    }

    /// Normalize one candidate, or `None` if it lacks a title or link.
    pub fn normalize(&self, candidate: RawCandidate, source: &str) -> Option<ArticleRecord> {
        let title = candidate
            .title
            .as_deref()
            .map(collapse_whitespace)
            .filter(|t| !t.is_empty());
        let link = candidate
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        let (Some(title), Some(link)) = (title, link) else {
            trace!(source, ?candidate, "Discarding candidate without title or link");
            return None;
        };

        Some(ArticleRecord {
            title,
            link,
            preview: candidate
                .preview
                .as_deref()
                .and_then(|p| self.clean_preview(p)),
            image_url: candidate.image_url.as_deref().and_then(valid_image_url),
            source: source.to_string(),
        })
    }

    /// Normalize a source's candidates in order, drop duplicate links and
    /// keep at most `limit` records.
    pub fn normalize_all(
        &self,
        candidates: Vec<RawCandidate>,
        source: &str,
        limit: usize,
    ) -> Vec<ArticleRecord> {
        candidates
            .into_iter()
            .filter_map(|c| self.normalize(c, source))
            .unique_by(|r| r.link.clone())
            .take(limit)
            .collect()
    }

    fn clean_preview(&self, raw: &str) -> Option<String> {
        let text = if raw.contains('<') || raw.contains('&') {
            strip_html(raw)
        } else {
            collapse_whitespace(raw)
        };
        if text.is_empty() {
            None
        } else {
            Some(truncate_chars(&text, self.preview_max_chars))
        }
    }
}

/// Plain text of an HTML fragment, whitespace collapsed.
pub fn strip_html(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    let text = doc.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

fn valid_image_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
