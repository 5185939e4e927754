//! Concurrent RSS/Atom aggregation into one normalized, newest-first post list.
//!
//! - [`feed`]: parsing, normalization, fetching and merging
//! - [`util`]: summary sanitization and URL validation
//! - [`config`]: optional TOML configuration

pub mod config;
pub mod feed;
pub mod util;
