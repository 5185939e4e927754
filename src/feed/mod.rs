//! Feed retrieval and normalization.
//!
//! This module turns a list of RSS and Atom URLs into one list of
//! [`Post`]s, newest first:
//!
//! - **Parsing**: deserialize the raw RSS/Atom tree and find its items
//! - **Normalization**: resolve each logical field through a fallback chain,
//!   parse dates across many layouts, sanitize summaries
//! - **Fetching**: bounded HTTP retrieval of a single feed
//! - **Aggregation**: concurrent fan-out over all feeds and a stable merge
//!
//! # Architecture
//!
//! - [`types`] - Raw feed tree, [`Post`] and item [`Diagnostic`]s
//! - [`resolver`] - Author, summary and link fallback chains
//! - [`date`] - Date layouts and the date fallback chain
//! - [`parser`] - Bytes to [`ParsedFeed`]
//! - [`fetcher`] - URL to [`ParsedFeed`] over HTTP
//! - [`aggregator`] - Many URLs to one sorted post list
//!
//! # Example
//!
//! ```no_run
//! use feedmerge::feed::{Aggregator, FetchOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let aggregator = Aggregator::new(FetchOptions::default())?;
//! let posts = aggregator
//!     .fetch_all(&["https://blog.rust-lang.org/feed.xml"])
//!     .await;
//! for post in &posts {
//!     println!("{} {}", post.date(), post.title());
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod date;
pub mod fetcher;
pub mod parser;
pub mod resolver;
pub mod types;

pub use aggregator::{merge_newest_first, AggregateReport, Aggregator, FeedFailure, ItemDiagnostic};
pub use date::{parse_date, resolve_date, resolve_date_at, DateIssue, DateLayout, DateResolution};
pub use fetcher::{
    build_client, fetch_feed, FeedError, FetchOptions, TransportError, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT, MAX_FEED_SIZE,
};
pub use parser::{decode_tree, parse_feed, parse_feed_at, ParseError, ParsedFeed};
pub use resolver::{resolve_author, resolve_link, select_summary, SUMMARY_PLACEHOLDER};
pub use types::{Diagnostic, ItemLocation, Post, RawFeed, RawItem, Text};
