//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Text processing**: turning feed HTML into bounded, Markdown-safe plain text
//! - **URL validation**: rejecting non-HTTP(S) feed sources before any request is made
//!
//! # Examples
//!
//! ```
//! use feedmerge::util::{sanitize, validate_url, SUMMARY_MAX_LENGTH};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! let summary = sanitize("<p>Release <em>notes</em></p>", SUMMARY_MAX_LENGTH);
//! assert_eq!(summary, "Release notes");
//! ```

mod text;
mod url_validator;

pub use text::{sanitize, strip_reserved, RESERVED_CHARS, SUMMARY_MAX_LENGTH};
pub use url_validator::{validate_url, UrlValidationError};
