//! RSS 2.0 / RSS 1.0 / Atom feed adapter.
//!
//! The feed is streamed through quick-xml; only the fields the aggregator
//! cares about are kept:
//!
//! | Field | Elements |
//! |-------|----------|
//! | title | `<title>` |
//! | link | `<link>` text, or Atom `<link href>` (`rel` absent or `alternate`) |
//! | preview | `<description>`, `<summary>`, `<content:encoded>`, `<content>` |
//! | image | `<enclosure type="image/*">`, `<media:content>`, `<media:thumbnail>`, Atom `rel="enclosure"` |

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument};
use url::Url;

use crate::error::SourceError;
use crate::fetch::Fetch;
use crate::models::RawCandidate;
use crate::scrapers::distinct_links;
use crate::utils::truncate_for_log;

#[derive(Debug, Clone)]
pub struct RssAdapter {
    url: Url,
}

impl RssAdapter {
    pub fn new(url: Url) -> Self {
        Self { url }
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
        let body = fetcher.fetch_text(self.url.as_str()).await?;
        let mut items = parse_feed(&body).inspect_err(|e| {
            debug!(error = %e, body = %truncate_for_log(&body, 300), "Feed did not parse");
        })?;
        for item in &mut items {
            item.link = item.link.take().map(|l| resolve(&self.url, &l));
        }
        let mut items = distinct_links(items);
        items.truncate(limit);
        debug!(count = items.len(), "Parsed feed items");
        Ok(items)
    }
}

fn resolve(base: &Url, link: &str) -> String {
    base.join(link.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| link.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Preview,
}

/// Parse a feed document into candidates, in document order.
///
/// A document whose root is not `<rss>`, `<feed>` or `<rdf:RDF>` is a parse
/// failure, as is malformed XML.
pub fn parse_feed(xml: &str) -> Result<Vec<RawCandidate>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut root_checked = false;
    let mut current: Option<RawCandidate> = None;
    let mut field: Option<Field> = None;
    let mut nested = 0usize;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            SourceError::Parse(format!(
                "malformed XML near byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                if !root_checked {
                    check_root(&e)?;
                    root_checked = true;
                    continue;
                }
                let name = e.name();
                if current.is_none() {
                    if is_item(name.as_ref()) {
                        current = Some(RawCandidate::default());
                    }
                    continue;
                }
                let Some(item) = current.as_mut() else {
                    continue;
                };
                if field.is_some() {
                    // markup inside a field, e.g. Atom xhtml content
                    nested += 1;
                    continue;
                }
                field = match name.as_ref() {
                    b"title" => Some(Field::Title),
                    b"link" => {
                        apply_link_attributes(item, &e);
                        Some(Field::Link)
                    }
                    b"description" | b"summary" | b"content:encoded" | b"content" => {
                        Some(Field::Preview)
                    }
                    b"enclosure" | b"media:content" | b"media:thumbnail" => {
                        apply_image_attributes(item, &e);
                        None
                    }
                    _ => None,
                };
                text.clear();
            }
            Event::Empty(e) => {
                if !root_checked {
                    check_root(&e)?;
                    root_checked = true;
                    continue;
                }
                if field.is_some() {
                    continue;
                }
                if let Some(item) = current.as_mut() {
                    match e.name().as_ref() {
                        b"link" => apply_link_attributes(item, &e),
                        b"enclosure" | b"media:content" | b"media:thumbnail" => {
                            apply_image_attributes(item, &e)
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) if field.is_some() => text.push_str(&utf8(&t)?),
            Event::CData(c) if field.is_some() => text.push_str(&utf8(&c)?),
            Event::GeneralRef(r) if field.is_some() => text.push_str(&resolve_entity(&utf8(&r)?)),
            Event::End(e) => {
                if let Some(f) = field {
                    if nested > 0 {
                        nested -= 1;
                        continue;
                    }
                    if let Some(item) = current.as_mut() {
                        store_field(item, f, std::mem::take(&mut text));
                    }
                    field = None;
                } else if is_item(e.name().as_ref()) {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_checked {
        return Err(SourceError::Parse("empty document".into()));
    }
    Ok(items)
}

fn check_root(e: &BytesStart<'_>) -> Result<(), SourceError> {
    match e.local_name().as_ref() {
        b"rss" | b"feed" | b"RDF" => Ok(()),
        other => Err(SourceError::Parse(format!(
            "not a feed: root element is <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn is_item(name: &[u8]) -> bool {
    matches!(name, b"item" | b"entry")
}

fn store_field(item: &mut RawCandidate, field: Field, value: String) {
    if value.trim().is_empty() {
        return;
    }
    let slot = match field {
        Field::Title => &mut item.title,
        Field::Link => &mut item.link,
        Field::Preview => &mut item.preview,
    };
    // first non-empty value wins (description before content:encoded)
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn apply_link_attributes(item: &mut RawCandidate, e: &BytesStart<'_>) {
    let Some(href) = attribute(e, b"href") else {
        return;
    };
    match attribute(e, b"rel").as_deref() {
        None | Some("alternate") => {
            if item.link.is_none() {
                item.link = Some(href);
            }
        }
        Some("enclosure") if is_image(e) => {
            if item.image_url.is_none() {
                item.image_url = Some(href);
            }
        }
        _ => {}
    }
}

fn apply_image_attributes(item: &mut RawCandidate, e: &BytesStart<'_>) {
    if item.image_url.is_some() {
        return;
    }
    let thumbnail = e.name().as_ref() == b"media:thumbnail";
    let medium_image = attribute(e, b"medium").as_deref() == Some("image");
    if thumbnail || medium_image || is_image(e) {
        item.image_url = attribute(e, b"url");
    }
}

fn is_image(e: &BytesStart<'_>) -> bool {
    attribute(e, b"type").is_some_and(|t| t.starts_with("image/"))
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() != key {
            return None;
        }
        let raw = std::str::from_utf8(&attr.value).ok()?;
        let value = quick_xml::escape::unescape(raw)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        Some(value)
    })
}

fn utf8(bytes: &[u8]) -> Result<String, SourceError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SourceError::Parse(format!("invalid UTF-8 in feed: {e}")))
}

/// Resolve an entity reference (`amp`, `#8217`, `#x2019`). Unknown named
/// entities are kept verbatim so HTML previews can decode them later.
fn resolve_entity(name: &str) -> String {
    let predefined = match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    };
    let numeric = name.strip_prefix('#').and_then(|num| {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code)
    });
    match predefined.or(numeric) {
        Some(c) => c.to_string(),
        None => format!("&{name};"),
    }
}
