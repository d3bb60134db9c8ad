//! HTML page for the web view.
//!
//! The page layout lives in `templates/index.html`, embedded at compile time.
//! The template has four placeholders, filled in here:
//!
//! - `{{title}}`, `{{limit}}`, `{{generated}}`: plain values
//! - `{{nav}}`: links to each source section
//! - `{{body}}`: one `<section>` per source, one `<article>` per record
//!
//! Every value taken from a feed or page is HTML-escaped.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

use crate::models::{AggregationResult, ArticleRecord, SourceResult};
use crate::utils::slugify;

/// Where the page template comes from, for `--version` output.
pub const TEMPLATE_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/index.html");

const TEMPLATE: &str = include_str!("../../templates/index.html");
const PAGE_TITLE: &str = "Τα πιο δημοφιλή";

/// Render a full page. `generated` is shown in the footer.
pub fn render_page(result: &AggregationResult, generated: &str) -> String {
    let mut nav = String::new();
    let mut body = String::new();
    for source in &result.sources {
        let _ = write!(
            nav,
            r##"<a href="#{}">{}</a>"##,
            encode_double_quoted_attribute(&slugify(&source.source)),
            encode_text(&source.source)
        );
        render_section(&mut body, source);
    }
    fill(result.limit, &nav, &body, generated)
}

/// A page carrying only an error message, used for invalid input.
pub fn render_error_page(message: &str, default_limit: usize, generated: &str) -> String {
    let body = format!(
        "  <section>\n    <h2>Invalid request</h2>\n    <p class=\"empty\">{}</p>\n  </section>\n",
        encode_text(message)
    );
    fill(default_limit, "", &body, generated)
}

/// Fill the placeholders in one pass over the template, so text inserted
/// for one placeholder is never scanned for another.
fn fill(limit: usize, nav: &str, body: &str, generated: &str) -> String {
    let limit = limit.to_string();
    let generated = encode_text(generated);
    let mut out = String::with_capacity(TEMPLATE.len() + nav.len() + body.len());
    let mut rest = TEMPLATE;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let value = match &after[..end] {
            "title" => PAGE_TITLE,
            "limit" => limit.as_str(),
            "generated" => &*generated,
            "nav" => nav,
            "body" => body,
            _ => &rest[start..start + end + 4],
        };
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn render_section(out: &mut String, source: &SourceResult) {
    let _ = writeln!(
        out,
        "  <section id=\"{}\">\n    <h2>{}</h2>",
        encode_double_quoted_attribute(&slugify(&source.source)),
        encode_text(&source.source)
    );
    if source.articles.is_empty() {
        let _ = writeln!(
            out,
            "    <p class=\"empty\">No results for {}</p>",
            encode_text(&source.source)
        );
    }
    for article in &source.articles {
        render_article(out, article);
    }
    out.push_str("  </section>\n");
}

fn render_article(out: &mut String, article: &ArticleRecord) {
    out.push_str("    <article>\n");
    if let Some(image) = &article.image_url {
        let _ = writeln!(
            out,
            "      <img src=\"{}\" alt=\"\" loading=\"lazy\">",
            encode_double_quoted_attribute(image)
        );
    }
    out.push_str("      <div>\n");
    let _ = writeln!(
        out,
        "        <h3><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></h3>",
        encode_double_quoted_attribute(&article.link),
        encode_text(&article.title)
    );
    if let Some(preview) = &article.preview {
        let _ = writeln!(out, "        <p>{}</p>", encode_text(preview));
    }
    out.push_str("      </div>\n    </article>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;

    fn result() -> AggregationResult {
        AggregationResult {
            limit: 5,
            sources: vec![
                SourceResult::ok(
                    "Proto Thema",
                    vec![ArticleRecord {
                        title: "Tom & <Jerry>".into(),
                        link: "https://protothema.gr/a?x=1&y=\"2\"".into(),
                        preview: Some("Μια περίληψη".into()),
                        image_url: Some("https://cdn.protothema.gr/1.jpg".into()),
                        source: "Proto Thema".into(),
                    }],
                ),
                SourceResult::failed("SKAI", &SourceError::Unavailable("503".into())),
            ],
        }
    }

    #[test]
    fn test_page_contains_escaped_articles() {
        let page = render_page(&result(), "2026-01-01 10:00");
        assert!(page.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(page.contains("href=\"https://protothema.gr/a?x=1&amp;y=&quot;2&quot;\""));
        assert!(page.contains("<img src=\"https://cdn.protothema.gr/1.jpg\""));
        assert!(page.contains("<p>Μια περίληψη</p>"));
        assert!(page.contains("<section id=\"proto-thema\">"));
        assert!(page.contains("No results for SKAI"));
        assert!(page.contains("value=\"5\""));
        assert!(page.contains("Generated 2026-01-01 10:00"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_sources_in_order() {
        let page = render_page(&result(), "now");
        let proto = page.find("<h2>Proto Thema</h2>").unwrap();
        let skai = page.find("<h2>SKAI</h2>").unwrap();
        assert!(proto < skai);
    }

    #[test]
    fn test_placeholder_text_in_names_is_left_alone() {
        let result = AggregationResult {
            limit: 3,
            sources: vec![SourceResult::ok(
                "{{body}}",
                vec![ArticleRecord {
                    title: "{{nav}} and {{limit}}".into(),
                    link: "https://a.gr/1".into(),
                    preview: None,
                    image_url: None,
                    source: "{{body}}".into(),
                }],
            )],
        };
        let page = render_page(&result, "now");
        assert_eq!(page.matches("<section id=").count(), 1);
        assert!(page.contains("<h2>{{body}}</h2>"));
        assert!(page.contains(">{{nav}} and {{limit}}</a>"));
    }

    #[test]
    fn test_error_page() {
        let page = render_error_page("n must be > 0", 10, "now");
        assert!(page.contains("n must be &gt; 0"));
        assert!(page.contains("value=\"10\""));
    }
}
