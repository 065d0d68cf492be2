//! Batch processing: normalize → dedupe → filter → classify.
//!
//! Per-entry evaluation runs on a small blocking worker pool and never touches
//! the seen set. Verdicts come back in input order and are folded into the
//! seen set sequentially, so no lock is needed and a duplicate later in the
//! same batch is skipped exactly as if the batch had run one entry at a time.
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::classify::{Classification, Classifier};
use crate::feed::RawEntry;
use crate::storage::SeenSet;
use crate::util::{normalize_link, prefix, truncate_summary, NormalizeError};
use crate::util::{LOG_TITLE_CHARS, SUMMARY_MAX_CHARS};

/// Only the first this-many merged entries are looked at per run.
pub const MAX_ENTRIES_PER_RUN: usize = 50;

/// Size of the classification worker pool.
pub const WORKERS: usize = 4;

/// A new, relevant article ready for the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedArticle {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    /// At most 300 characters plus an ellipsis when shortened
    pub summary: String,
    pub is_addition: bool,
    pub is_removal: bool,
}

/// What a worker concluded about one entry, before consulting the seen set.
#[derive(Debug)]
enum Verdict {
    InvalidLink {
        title: String,
        error: NormalizeError,
    },
    Irrelevant {
        id: String,
    },
    Relevant {
        id: String,
        article: ClassifiedArticle,
    },
}

fn evaluate(entry: RawEntry, classifier: &Classifier) -> Verdict {
    let id = match normalize_link(&entry.link) {
        Ok(id) => id,
        Err(error) => {
            return Verdict::InvalidLink {
                title: entry.title,
                error,
            }
        }
    };

    let summary = entry.summary.as_deref();
    let Some(Classification {
        is_addition,
        is_removal,
    }) = classifier.evaluate(&entry.title, summary)
    else {
        return Verdict::Irrelevant { id };
    };

    let summary = truncate_summary(summary.unwrap_or(""), SUMMARY_MAX_CHARS).into_owned();
    Verdict::Relevant {
        id,
        article: ClassifiedArticle {
            title: entry.title,
            link: entry.link,
            published: entry.published,
            summary,
            is_addition,
            is_removal,
        },
    }
}

/// Processes one run's merged entry list against the seen set.
///
/// # Behavior
///
/// - Only the first [`MAX_ENTRIES_PER_RUN`] entries are considered
/// - Entries whose canonical id is already in `seen` produce nothing
/// - Irrelevant entries produce nothing and are NOT added to `seen`, so a
///   later rules change can still pick them up
/// - Relevant new entries are returned and their canonical id is added to `seen`
/// - Entries with unparseable links are logged and skipped
///
/// Output order follows input order.
pub async fn process(
    mut entries: Vec<RawEntry>,
    seen: &mut SeenSet,
    classifier: Arc<Classifier>,
) -> Vec<ClassifiedArticle> {
    if entries.len() > MAX_ENTRIES_PER_RUN {
        tracing::info!(
            total = entries.len(),
            kept = MAX_ENTRIES_PER_RUN,
            "Entry list capped for this run"
        );
        entries.truncate(MAX_ENTRIES_PER_RUN);
    }

    let verdicts: Vec<_> = stream::iter(entries)
        .map(|entry| {
            let classifier = Arc::clone(&classifier);
            tokio::task::spawn_blocking(move || evaluate(entry, &classifier))
        })
        .buffered(WORKERS)
        .collect()
        .await;

    let mut articles = Vec::new();
    for verdict in verdicts {
        match verdict {
            Err(e) => {
                tracing::error!(error = %e, "Entry worker failed, skipping entry");
            }
            Ok(Verdict::InvalidLink { title, error }) => {
                tracing::warn!(
                    title = %prefix(&title, LOG_TITLE_CHARS),
                    error = %error,
                    "Skipping entry with invalid link"
                );
            }
            Ok(Verdict::Irrelevant { id }) => {
                tracing::debug!(id = %id, "Not relevant");
            }
            Ok(Verdict::Relevant { id, article }) => {
                if !seen.insert(id) {
                    continue;
                }
                tracing::info!(
                    title = %prefix(&article.title, LOG_TITLE_CHARS),
                    addition = article.is_addition,
                    removal = article.is_removal,
                    "New Game Pass article"
                );
                articles.push(article);
            }
        }
    }

    articles
}
