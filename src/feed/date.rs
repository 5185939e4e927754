//! Date normalization for the many ways feeds write timestamps.
//!
//! RSS asks for RFC 822 dates, Atom for RFC 3339, and real feeds ship
//! everything in between. [`resolve_date`] picks the item's first populated
//! date field and tries each [`DateLayout`] in order against it.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::types::RawItem;

/// Date fields in lookup order, with the element name used in diagnostics.
const DATE_FIELDS: &[(&str, super::resolver::FieldAccessor)] = &[
    ("pubDate", RawItem::pub_date),
    ("date", RawItem::date),
    ("published", RawItem::published),
    ("updated", RawItem::updated),
];

/// A textual date layout seen in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123NumericZone,
    /// `Mon, 02 Jan 2006 15:04:05 GMT`
    Rfc1123NamedZone,
    /// `2006-01-02T15:04:05+07:00`, fractional seconds optional
    Rfc3339,
    /// `2006-01-02T15:04:05Z`
    IsoUtc,
    /// `2006-01-02 15:04:05 -0700`
    SpacedNumericZone,
    /// `02 Jan 2006 15:04 -0700`
    ShortNumericZone,
    /// `2006-01-02`, read as midnight UTC
    DateOnly,
    /// `January 2, 2006`, read as midnight UTC
    LongMonthName,
}

/// Layouts in the order they are tried. The first match wins.
pub const DATE_LAYOUTS: &[DateLayout] = &[
    DateLayout::Rfc1123NumericZone,
    DateLayout::Rfc1123NamedZone,
    DateLayout::Rfc3339,
    DateLayout::IsoUtc,
    DateLayout::SpacedNumericZone,
    DateLayout::ShortNumericZone,
    DateLayout::DateOnly,
    DateLayout::LongMonthName,
];

impl DateLayout {
    /// Parses `value` with this layout alone.
    pub fn parse(self, value: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::Rfc1123NumericZone => {
                DateTime::parse_from_str(strip_weekday(value), "%d %b %Y %H:%M:%S %z")
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            DateLayout::Rfc1123NamedZone => {
                let (datetime, zone) = strip_weekday(value).rsplit_once(' ')?;
                let offset = zone_offset(zone)?;
                let naive = NaiveDateTime::parse_from_str(datetime, "%d %b %Y %H:%M:%S").ok()?;
                offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::IsoUtc => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ")
                .ok()
                .map(|naive| naive.and_utc()),
            DateLayout::SpacedNumericZone => {
                DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z")
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            DateLayout::ShortNumericZone => DateTime::parse_from_str(value, "%d %b %Y %H:%M %z")
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::DateOnly => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(midnight_utc),
            DateLayout::LongMonthName => NaiveDate::parse_from_str(value, "%B %d, %Y")
                .ok()
                .and_then(midnight_utc),
        }
    }
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Drops a leading `"Mon, "`. The weekday is never checked against the date;
/// feeds get it wrong often enough that rejecting the date would lose more
/// than it protects.
fn strip_weekday(value: &str) -> &str {
    match value.split_once(", ") {
        Some((day, rest)) if !day.is_empty() && day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest
        }
        _ => value,
    }
}

/// Offset for an alphabetic zone abbreviation. Unknown abbreviations read as
/// UTC; anything non-alphabetic is not an abbreviation at all.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        // GMT, UT, UTC, Z and anything unrecognized
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Parses `value` against every layout in [`DATE_LAYOUTS`] order.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DATE_LAYOUTS.iter().find_map(|layout| layout.parse(value))
}

/// Why a resolved date is the fallback rather than the item's own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateIssue {
    /// Every date field was empty.
    Missing,
    /// The first populated field matched no layout.
    Unparseable { field: &'static str, value: String },
}

/// Outcome of [`resolve_date`]: always a usable timestamp, plus the reason
/// when that timestamp is the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateResolution {
    pub date: DateTime<Utc>,
    pub issue: Option<DateIssue>,
}

/// Resolves an item's publication time, falling back to the current time.
pub fn resolve_date(item: &RawItem) -> DateResolution {
    resolve_date_at(item, Utc::now())
}

/// Like [`resolve_date`] with an explicit fallback time.
///
/// Only the first populated date field is considered. If it matches no
/// layout the later fields are not consulted, even when one of them would
/// parse.
pub fn resolve_date_at(item: &RawItem, now: DateTime<Utc>) -> DateResolution {
    let candidate = DATE_FIELDS
        .iter()
        .map(|(field, read)| (*field, read(item)))
        .find(|(_, value)| !value.is_empty());

    let Some((field, value)) = candidate else {
        return DateResolution {
            date: now,
            issue: Some(DateIssue::Missing),
        };
    };

    match parse_date(value) {
        Some(date) => DateResolution { date, issue: None },
        None => DateResolution {
            date: now,
            issue: Some(DateIssue::Unparseable {
                field,
                value: value.to_string(),
            }),
        },
    }
}
