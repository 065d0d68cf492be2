//! Utility functions shared by the fetcher, batch processor and mailer.
//!
//! - **Identity**: canonical article ids derived from links, source URL checks
//! - **Text processing**: feed HTML to plain text, summary truncation and
//!   whitespace/control cleanup

mod identity;
mod text;

pub use identity::{normalize_link, validate_source_url, NormalizeError};
pub use text::{clean_text, prefix, strip_html, truncate_summary};

/// Maximum summary length (in characters) carried into the digest.
pub const SUMMARY_MAX_CHARS: usize = 300;

/// Title prefix length used for log context.
pub const LOG_TITLE_CHARS: usize = 50;
