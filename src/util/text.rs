use std::borrow::Cow;
use std::sync::OnceLock;

use html_escape::decode_html_entities;
use regex::Regex;

/// Maximum summary length, in characters, before the ellipsis is appended.
pub const SUMMARY_MAX_LENGTH: usize = 200;

/// Ellipsis appended to truncated text
const ELLIPSIS: &str = "...";

/// Characters with meaning in Markdown output. Removed from summaries so the
/// rendered post list cannot pick up stray emphasis, headings, or links.
pub const RESERVED_CHARS: &[char] = &[
    '*', '_', '#', '`', '>', '<', '[', ']', '(', ')', '!', '~', '|', '{', '}', '+',
];

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is a valid regex"))
}

fn whitespace_pattern() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"))
}

/// Turns feed-supplied HTML into a short plain-text summary.
///
/// The steps run in a fixed order:
///
/// 1. Remove anything that looks like a tag (`<...>`)
/// 2. Decode HTML entities (`&amp;`, `&#8217;`, `&nbsp;`, ...)
/// 3. Collapse every whitespace run into a single space
/// 4. Truncate to `max_length` characters with a trailing `...`
/// 5. Remove [`RESERVED_CHARS`]
/// 6. Trim
///
/// Truncation happens before reserved characters are removed, so the result
/// may come out a little shorter than `max_length + 3`. It is never longer.
///
/// # Examples
///
/// ```
/// use feedmerge::util::sanitize;
///
/// assert_eq!(sanitize("<p>Hello *world*!</p>", 200), "Hello world");
/// assert_eq!(sanitize("Fish &amp; Chips", 200), "Fish & Chips");
/// ```
pub fn sanitize(text: &str, max_length: usize) -> String {
    let untagged = tag_pattern().replace_all(text, "");
    let decoded = decode_html_entities(&untagged);
    let collapsed = whitespace_pattern().replace_all(&decoded, " ");
    let truncated = truncate_with_ellipsis(&collapsed, max_length);
    strip_reserved(&truncated).trim().to_string()
}

/// Cuts `s` to exactly `max_chars` characters and appends [`ELLIPSIS`].
///
/// A single trailing space or period left by the cut is dropped first so the
/// result never reads `"word ..."` or `"end...."`. Strings that already fit
/// are returned borrowed.
fn truncate_with_ellipsis(s: &str, max_chars: usize) -> Cow<'_, str> {
    // Byte offset of the first character past the limit, if there is one
    let Some((cut, _)) = s.char_indices().nth(max_chars) else {
        return Cow::Borrowed(s);
    };

    let head = &s[..cut];
    let head = head
        .strip_suffix(' ')
        .or_else(|| head.strip_suffix('.'))
        .unwrap_or(head);

    Cow::Owned(format!("{}{}", head, ELLIPSIS))
}

/// Removes every [`RESERVED_CHARS`] occurrence.
///
/// Returns `Cow::Borrowed` when there is nothing to remove (common case).
pub fn strip_reserved(s: &str) -> Cow<'_, str> {
    if s.contains(RESERVED_CHARS) {
        Cow::Owned(s.replace(RESERVED_CHARS, ""))
    } else {
        Cow::Borrowed(s)
    }
}
