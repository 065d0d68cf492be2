//! One scheduled run: load seen → fetch → process → deliver → persist.
use std::sync::Arc;

use crate::classify::Classifier;
use crate::config::Language;
use crate::feed::EntrySource;
use crate::mail::Mailer;
use crate::pipeline::{process, ClassifiedArticle};
use crate::storage::SeenStore;

/// What happened to the digest in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// No source could be fetched; nothing was processed
    Skipped,
    /// Processing found no new articles
    NothingToSend,
    Sent,
    Failed,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Entries returned by the sources before capping
    pub fetched: usize,
    pub articles: Vec<ClassifiedArticle>,
    pub delivery: Delivery,
    /// Whether the seen set was written successfully
    pub persisted: bool,
}

/// Wires the run's capabilities together.
pub struct Notifier<'a> {
    pub source: &'a dyn EntrySource,
    pub store: &'a dyn SeenStore,
    pub mailer: &'a dyn Mailer,
    pub classifier: Arc<Classifier>,
    pub sources: &'a [String],
    pub language: Language,
}

impl Notifier<'_> {
    /// Executes one run. Never fails: every error is logged and reflected in
    /// the report, and the seen set is saved exactly once at the end.
    ///
    /// A digest that fails to send still has its articles marked seen; they
    /// will not be re-sent on the next run.
    pub async fn run(&self) -> RunReport {
        let mut seen = self.store.load();
        tracing::info!(seen = seen.len(), "Starting Game Pass feed check");

        let mut report = RunReport {
            fetched: 0,
            articles: Vec::new(),
            delivery: Delivery::Skipped,
            persisted: false,
        };

        match self.source.fetch_entries(self.sources).await {
            Err(e) => {
                tracing::error!(error = %e, "No feed data this run, skipping email");
            }
            Ok(entries) => {
                report.fetched = entries.len();
                tracing::info!(entries = entries.len(), "Fetched feed entries");

                report.articles = process(entries, &mut seen, Arc::clone(&self.classifier)).await;

                report.delivery = if report.articles.is_empty() {
                    tracing::info!("No new Game Pass news");
                    Delivery::NothingToSend
                } else {
                    tracing::info!(articles = report.articles.len(), "Sending digest email");
                    match self.mailer.send(&report.articles, self.language).await {
                        Ok(()) => Delivery::Sent,
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                articles = report.articles.len(),
                                "Digest delivery failed; articles stay marked as seen"
                            );
                            Delivery::Failed
                        }
                    }
                };
            }
        }

        report.persisted = match self.store.save(&seen) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist seen articles");
                false
            }
        };

        report
    }
}
