//! Plain-text listing for the terminal.
//!
//! ```text
//! == Kathimerini ==
//!  1. Title of the article - https://www.kathimerini.gr/...
//!     Short preview of the article
//!
//! == SKAI ==
//!  (no results: HTTP 503 for https://www.skai.gr/...)
//! ```

use std::fmt::Write;

use crate::models::AggregationResult;

pub fn render(result: &AggregationResult) -> String {
    let mut out = String::new();
    for (i, source) in result.sources.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        // writing to a String cannot fail
        let _ = writeln!(out, "== {} ==", source.source);
        if source.articles.is_empty() {
            match &source.failure {
                Some(failure) => {
                    let _ = writeln!(out, " (no results: {failure})");
                }
                None => out.push_str(" (no results)\n"),
            }
            continue;
        }
        for (idx, article) in source.articles.iter().enumerate() {
            let _ = writeln!(out, "{:>2}. {} - {}", idx + 1, article.title, article.link);
            if let Some(preview) = &article.preview {
                let _ = writeln!(out, "    {preview}");
            }
        }
    }
    out
}
