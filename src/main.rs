use anyhow::{Context, Result};
use std::sync::Arc;

use passwatch::classify::Classifier;
use passwatch::config::{Rules, Settings};
use passwatch::feed::FeedFetcher;
use passwatch::mail::SmtpMailer;
use passwatch::retry::RetryPolicy;
use passwatch::runner::{Delivery, Notifier};
use passwatch::storage::JsonSeenStore;

/// Compile the rules file, falling back to the built-in rules on any problem.
fn load_classifier(settings: &Settings) -> Result<Classifier> {
    let rules = match Rules::load(&settings.rules_path) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!(
                path = %settings.rules_path.display(),
                error = %e,
                "Rules file unusable, using built-in rules"
            );
            Rules::default()
        }
    };

    match Classifier::new(&rules) {
        Ok(classifier) => Ok(classifier),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid pattern in rules file, using built-in rules");
            Classifier::new(&Rules::default()).context("Built-in rules failed to compile")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Configuration errors are fatal before any work is attempted
    let settings = Settings::from_env().context("Invalid environment configuration")?;
    tracing::debug!(?settings, "Loaded settings");

    let classifier = Arc::new(load_classifier(&settings)?);
    let fetcher = FeedFetcher::new(settings.fetch_retry).context("Failed to build HTTP client")?;
    let store = JsonSeenStore::new(&settings.seen_path);
    let mailer = SmtpMailer::new(&settings.smtp, RetryPolicy::default())
        .context("Invalid SMTP configuration")?;

    let notifier = Notifier {
        source: &fetcher,
        store: &store,
        mailer: &mailer,
        classifier,
        sources: &settings.sources,
        language: settings.language,
    };

    let report = notifier.run().await;
    match report.delivery {
        Delivery::Sent => tracing::info!(articles = report.articles.len(), "Run complete"),
        Delivery::NothingToSend => tracing::info!("Run complete, nothing new"),
        Delivery::Failed => tracing::warn!("Run complete, email delivery failed"),
        Delivery::Skipped => tracing::warn!("Run complete, all feed sources failed"),
    }

    Ok(())
}
