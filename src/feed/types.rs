//! Raw feed tree produced by XML deserialization, and the normalized post
//! record built from it.
//!
//! The raw types mirror the union of RSS 2.0, RSS 1.0 and Atom 1.0 element
//! names. Element names are matched without their namespace prefix, so
//! `dc:creator` fills [`RawItem::creator`] and `content:encoded` fills
//! [`RawItem::encoded`]. Text fields are sequences because the same local
//! name can legitimately repeat (`title` next to `media:title`, several Atom
//! `link`s); accessors return the first non-empty value.
//!
//! Text fields are read as [`Text`], which tolerates child elements. A
//! `media:content` holding a `media:title`, or Atom `type="xhtml"` content
//! wrapped in a `<div>`, reads as the joined character data instead of
//! failing the document.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Character data of one element.
///
/// Text inside nested elements is joined in document order with single
/// spaces; attributes are skipped. The value is otherwise kept as the
/// deserializer produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text(String);

impl Text {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TextVisitor)
    }
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Text;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("element text")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Text, E> {
        Ok(Text::from(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Text, E> {
        Ok(Text(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Text, E> {
        Ok(Text::default())
    }

    // Keys are `@attr` for attributes, `$text` for character data and the
    // element name for children.
    fn visit_map<A>(self, mut map: A) -> Result<Text, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut parts: Vec<String> = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if key.starts_with('@') {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            let part: Text = map.next_value()?;
            if !part.0.is_empty() {
                parts.push(part.0);
            }
        }
        Ok(Text(parts.join(" ")))
    }
}

/// Root of a deserialized feed document (`<rss>`, `<feed>` or `<rdf:RDF>`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFeed {
    /// Atom feed title (`<feed><title>`)
    pub title: Vec<Text>,
    /// RSS channel, also present in RSS 1.0 documents
    pub channel: Option<RawChannel>,
    /// Atom entries directly under the root
    #[serde(rename = "entry")]
    pub entries: Vec<RawItem>,
    /// RSS 1.0 items, which are siblings of the channel rather than children
    #[serde(rename = "item")]
    pub items: Vec<RawItem>,
}

/// `<channel>` element.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawChannel {
    pub title: Vec<Text>,
    #[serde(rename = "item")]
    pub items: Vec<RawItem>,
    #[serde(rename = "entry")]
    pub entries: Vec<RawItem>,
}

/// Where a feed's items were found. Variants are listed in lookup priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLocation {
    /// `<rss><channel><item>`
    ChannelItems,
    /// `<channel><entry>`
    ChannelEntries,
    /// `<feed><entry>`
    RootEntries,
    /// `<rdf:RDF><item>`
    RootItems,
}

impl RawFeed {
    /// Returns the first non-empty item sequence in priority order.
    ///
    /// Locations are never merged: a document with both channel items and
    /// root entries yields only the channel items.
    pub fn locate_items(&self) -> Option<(ItemLocation, &[RawItem])> {
        let (channel_items, channel_entries) = match &self.channel {
            Some(channel) => (channel.items.as_slice(), channel.entries.as_slice()),
            None => (&[][..], &[][..]),
        };

        [
            (ItemLocation::ChannelItems, channel_items),
            (ItemLocation::ChannelEntries, channel_entries),
            (ItemLocation::RootEntries, self.entries.as_slice()),
            (ItemLocation::RootItems, self.items.as_slice()),
        ]
        .into_iter()
        .find(|(_, items)| !items.is_empty())
    }

    /// Feed title used as the author of last resort.
    ///
    /// The channel title wins; Atom documents have no channel, so the root
    /// `<title>` is used there. Empty when neither is present.
    pub fn title(&self) -> &str {
        let channel_title = self
            .channel
            .as_ref()
            .map(|c| first_non_empty(&c.title))
            .unwrap_or("");
        if !channel_title.is_empty() {
            return channel_title;
        }
        first_non_empty(&self.title)
    }
}

/// One `<item>` or `<entry>`, with every field variant side by side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawItem {
    pub title: Vec<Text>,
    pub link: Vec<RawLink>,
    #[serde(rename = "pubDate")]
    pub pub_date: Vec<Text>,
    /// `dc:date`
    pub date: Vec<Text>,
    pub published: Vec<Text>,
    pub updated: Vec<Text>,
    pub author: Vec<RawPerson>,
    /// `dc:creator`
    pub creator: Vec<Text>,
    pub description: Vec<Text>,
    pub summary: Vec<Text>,
    pub content: Vec<Text>,
    /// `content:encoded`
    pub encoded: Vec<Text>,
}

/// RSS `<link>url</link>` or Atom `<link href="url" rel="..."/>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLink {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@rel")]
    pub rel: String,
    #[serde(rename = "$text")]
    pub text: String,
}

/// RSS `<author>text</author>` or Atom `<author><name>text</name></author>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPerson {
    pub name: Text,
    #[serde(rename = "$text")]
    pub text: String,
}

impl RawPerson {
    fn display_name(&self) -> &str {
        let name = self.name.as_str();
        if name.is_empty() {
            &self.text
        } else {
            name
        }
    }
}

fn first_non_empty(values: &[Text]) -> &str {
    values
        .iter()
        .map(Text::as_str)
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

// Flat accessors: "" means the field is missing. Values are not trimmed, so
// whitespace-only text still counts as present.
impl RawItem {
    pub fn title(&self) -> &str {
        first_non_empty(&self.title)
    }

    pub fn pub_date(&self) -> &str {
        first_non_empty(&self.pub_date)
    }

    pub fn date(&self) -> &str {
        first_non_empty(&self.date)
    }

    pub fn published(&self) -> &str {
        first_non_empty(&self.published)
    }

    pub fn updated(&self) -> &str {
        first_non_empty(&self.updated)
    }

    pub fn author(&self) -> &str {
        self.author
            .iter()
            .map(RawPerson::display_name)
            .find(|name| !name.is_empty())
            .unwrap_or("")
    }

    pub fn creator(&self) -> &str {
        first_non_empty(&self.creator)
    }

    pub fn description(&self) -> &str {
        first_non_empty(&self.description)
    }

    pub fn summary(&self) -> &str {
        first_non_empty(&self.summary)
    }

    pub fn content(&self) -> &str {
        first_non_empty(&self.content)
    }

    pub fn encoded(&self) -> &str {
        first_non_empty(&self.encoded)
    }
}

/// A post normalized from either feed format.
///
/// Built once by the parser and never modified afterwards; fields are only
/// readable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    title: String,
    link: String,
    date: DateTime<Utc>,
    author: String,
    summary: String,
}

impl Post {
    pub(crate) fn new(
        title: String,
        link: String,
        date: DateTime<Utc>,
        author: String,
        summary: String,
    ) -> Self {
        Self {
            title,
            link,
            date,
            author,
            summary,
        }
    }

    /// Title exactly as the feed supplied it
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// Publication time, or the fetch time if the feed gave none we could read
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Sanitized, Markdown-safe plain text
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// A degraded-but-valid outcome for a single item.
///
/// Field problems never fail an item; they are reported here instead so
/// callers can see which posts carry fallback values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// No date field was populated; the fetch time was used.
    MissingDate { title: String },
    /// The first populated date field matched no known layout; the fetch
    /// time was used.
    UnparseableDate {
        title: String,
        field: &'static str,
        value: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingDate { title } => {
                write!(f, "no date on item {:?}, using fetch time", title)
            }
            Diagnostic::UnparseableDate {
                title,
                field,
                value,
            } => write!(
                f,
                "could not parse {} {:?} on item {:?}, using fetch time",
                field, value, title
            ),
        }
    }
}
