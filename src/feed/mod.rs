//! Feed retrieval: source list, HTTP fetching with retry, and parsing.
//!
//! - [`fetcher`] - per-source retry, header rotation, fallback across sources
//! - [`parser`] - markup validation (`quick-xml`) and RSS/Atom parsing (`feed-rs`)
//! - [`headers`] - rotating browser-like header profiles
//!
//! # Example
//!
//! ```ignore
//! use passwatch::feed::{FeedFetcher, DEFAULT_SOURCES};
//!
//! let fetcher = FeedFetcher::new(RetryPolicy::default())?;
//! let sources: Vec<String> = DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect();
//! let entries = fetcher.fetch_all(&sources).await?;
//! ```

mod fetcher;
mod headers;
mod parser;

pub use fetcher::{EntrySource, FeedFetcher, FetchError};
pub use parser::{parse_feed, validate_markup, ParseResult, RawEntry};

/// Built-in source list, tried in order.
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://news.xbox.com/en-us/feed/",
    "https://news.xbox.com/en-us/tag/xbox-game-pass/feed/",
];
