use chrono::{DateTime, Utc};
use thiserror::Error;

use super::date::{resolve_date_at, DateIssue, DateResolution};
use super::resolver::{resolve_author, resolve_link, select_summary, SUMMARY_PLACEHOLDER};
use super::types::{Diagnostic, Post, RawFeed, RawItem};
use crate::util::{sanitize, SUMMARY_MAX_LENGTH};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors that make a whole feed document unusable.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Feed bytes are not UTF-8
    #[error("Feed is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    /// Markup is not well-formed XML
    #[error("Malformed feed markup: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Posts normalized from one feed document, in document order.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    /// Channel title (or Atom feed title); empty if the feed has none
    pub title: String,
    pub posts: Vec<Post>,
    /// Items that were built with fallback values
    pub diagnostics: Vec<Diagnostic>,
}

/// Deserializes feed bytes into the raw RSS/Atom tree.
///
/// # Security
///
/// quick-xml (0.37) never expands `<!ENTITY>` declarations; custom entity
/// references fail with an error instead, so documents cannot pull in
/// external content.
pub fn decode_tree(bytes: &[u8]) -> Result<RawFeed, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)?;
    Ok(quick_xml::de::from_str(text)?)
}

/// Parses an RSS or Atom document into normalized posts.
///
/// Items whose date cannot be read are stamped with the current time.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    parse_feed_at(bytes, Utc::now())
}

/// Like [`parse_feed`] with an explicit fallback time for undated items.
///
/// # Errors
///
/// Only document-level problems fail: invalid UTF-8 or malformed markup.
/// Individual items always produce a post.
pub fn parse_feed_at(bytes: &[u8], now: DateTime<Utc>) -> Result<ParsedFeed, ParseError> {
    let tree = decode_tree(bytes)?;
    let title = tree.title().to_string();

    let mut diagnostics = Vec::new();
    let posts = match tree.locate_items() {
        Some((location, items)) => {
            tracing::trace!(?location, count = items.len(), "Located feed items");
            items
                .iter()
                .map(|item| build_post(item, &title, now, &mut diagnostics))
                .collect()
        }
        None => Vec::new(),
    };

    Ok(ParsedFeed {
        title,
        posts,
        diagnostics,
    })
}

fn build_post(
    item: &RawItem,
    feed_title: &str,
    now: DateTime<Utc>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Post {
    let title = item.title().to_string();

    let DateResolution { date, issue } = resolve_date_at(item, now);
    match issue {
        Some(DateIssue::Missing) => diagnostics.push(Diagnostic::MissingDate {
            title: title.clone(),
        }),
        Some(DateIssue::Unparseable { field, value }) => {
            diagnostics.push(Diagnostic::UnparseableDate {
                title: title.clone(),
                field,
                value,
            })
        }
        None => {}
    }

    // A source made only of markup can sanitize down to nothing
    let summary = select_summary(item)
        .map(|raw| sanitize(raw, SUMMARY_MAX_LENGTH))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string());

    Post::new(
        title,
        resolve_link(item),
        date,
        resolve_author(item, feed_title),
        summary,
    )
}
