//! Fallback chains that pick one logical field out of a [`RawItem`].
//!
//! Every chain is an ordered list of accessors tried front to back; the first
//! non-empty value wins. RSS and Atom spell the same concept differently, so
//! the lists name both vocabularies.

use super::types::RawItem;

/// Reads one field variant off a raw item. `""` means missing.
pub type FieldAccessor = for<'a> fn(&'a RawItem) -> &'a str;

/// Summary used when an item carries no descriptive text at all.
pub const SUMMARY_PLACEHOLDER: &str = "Visit post for details.";

/// Author candidates: RSS/Atom `author`, then `dc:creator`.
pub const AUTHOR_FIELDS: &[FieldAccessor] = &[RawItem::author, RawItem::creator];

/// Summary candidates: RSS `description`, Atom `summary`, Atom `content`,
/// then `content:encoded`.
pub const SUMMARY_FIELDS: &[FieldAccessor] = &[
    RawItem::description,
    RawItem::summary,
    RawItem::content,
    RawItem::encoded,
];

/// Returns the first non-empty value among `fields`.
pub fn first_field<'a>(item: &'a RawItem, fields: &[FieldAccessor]) -> Option<&'a str> {
    fields
        .iter()
        .map(|field| field(item))
        .find(|value| !value.is_empty())
}

/// Picks the item's author, falling back to the enclosing feed's title.
///
/// The fallback is returned exactly as given, even when it is empty.
pub fn resolve_author(item: &RawItem, channel_fallback: &str) -> String {
    first_field(item, AUTHOR_FIELDS)
        .unwrap_or(channel_fallback)
        .to_string()
}

/// Picks the raw, unsanitized text the summary is built from.
///
/// `None` means the caller should use [`SUMMARY_PLACEHOLDER`].
pub fn select_summary(item: &RawItem) -> Option<&str> {
    first_field(item, SUMMARY_FIELDS)
}

/// Picks the post's permalink.
///
/// RSS puts the URL in the element text; Atom puts it in `href` and may list
/// several links, of which the `alternate` one (or one with no `rel`) is the
/// post itself. Any other `href` is better than nothing.
pub fn resolve_link(item: &RawItem) -> String {
    let links = &item.link;

    let text_link = links.iter().map(|l| l.text.trim()).find(|t| !t.is_empty());
    let alternate = || {
        links
            .iter()
            .filter(|l| matches!(l.rel.trim(), "" | "alternate"))
            .map(|l| l.href.trim())
            .find(|h| !h.is_empty())
    };
    let any_href = || links.iter().map(|l| l.href.trim()).find(|h| !h.is_empty());

    text_link
        .or_else(alternate)
        .or_else(any_href)
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::{RawLink, RawPerson, Text};

    fn person(text: &str) -> RawPerson {
        RawPerson {
            name: Text::default(),
            text: text.to_string(),
        }
    }

    fn link(href: &str, rel: &str) -> RawLink {
        RawLink {
            href: href.to_string(),
            rel: rel.to_string(),
            text: String::new(),
        }
    }

    #[test]
    fn test_author_field_wins() {
        let item = RawItem {
            author: vec![person("Alice")],
            creator: vec!["Bob".into()],
            ..Default::default()
        };
        assert_eq!(resolve_author(&item, "Channel"), "Alice");
    }

    #[test]
    fn test_creator_used_when_author_empty() {
        let item = RawItem {
            author: vec![person("")],
            creator: vec!["Bob".into()],
            ..Default::default()
        };
        assert_eq!(resolve_author(&item, "Channel"), "Bob");
    }

    #[test]
    fn test_channel_fallback_returned_exactly() {
        let item = RawItem::default();
        assert_eq!(resolve_author(&item, "Channel Title"), "Channel Title");
        assert_eq!(resolve_author(&item, ""), "");
    }

    #[test]
    fn test_summary_priority_order() {
        let item = RawItem {
            summary: vec!["atom summary".into()],
            content: vec!["atom content".into()],
            encoded: vec!["encoded".into()],
            ..Default::default()
        };
        assert_eq!(select_summary(&item), Some("atom summary"));

        let item = RawItem {
            description: vec!["<p>rss</p>".into()],
            encoded: vec!["encoded".into()],
            ..Default::default()
        };
        // Returned unsanitized
        assert_eq!(select_summary(&item), Some("<p>rss</p>"));

        let item = RawItem {
            encoded: vec!["only encoded".into()],
            ..Default::default()
        };
        assert_eq!(select_summary(&item), Some("only encoded"));
    }

    #[test]
    fn test_summary_none_when_all_empty() {
        let item = RawItem {
            description: vec![Text::default()],
            ..Default::default()
        };
        assert_eq!(select_summary(&item), None);
    }

    #[test]
    fn test_link_rss_text() {
        let item = RawItem {
            link: vec![RawLink {
                text: " https://example.com/post ".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(resolve_link(&item), "https://example.com/post");
    }

    #[test]
    fn test_link_atom_prefers_alternate() {
        let item = RawItem {
            link: vec![
                link("https://example.com/feed.atom", "self"),
                link("https://example.com/post", "alternate"),
            ],
            ..Default::default()
        };
        assert_eq!(resolve_link(&item), "https://example.com/post");

        let item = RawItem {
            link: vec![
                link("https://example.com/replies", "replies"),
                link("https://example.com/post", ""),
            ],
            ..Default::default()
        };
        assert_eq!(resolve_link(&item), "https://example.com/post");
    }

    #[test]
    fn test_link_falls_back_to_any_href() {
        let item = RawItem {
            link: vec![link("https://example.com/enclosure.mp3", "enclosure")],
            ..Default::default()
        };
        assert_eq!(resolve_link(&item), "https://example.com/enclosure.mp3");
        assert_eq!(resolve_link(&RawItem::default()), "");
    }
}
