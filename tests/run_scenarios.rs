//! End-to-end runs: mock feed servers, in-memory or on-disk seen set, and a
//! recording mailer standing in for SMTP.

use std::sync::Arc;

use async_trait::async_trait;
use passwatch::classify::Classifier;
use passwatch::config::{Language, Rules};
use passwatch::feed::{EntrySource, FeedFetcher, FetchError, RawEntry};
use passwatch::mail::RecordingMailer;
use passwatch::retry::RetryPolicy;
use passwatch::runner::{Delivery, Notifier};
use passwatch::storage::{JsonSeenStore, MemorySeenStore, SeenSet, SeenStore};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SILKSONG_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
    <title>News</title>
    <item>
        <title>Hollow Knight: Silksong Day One on Game Pass</title>
        <link>https://news.example.com/a?utm=1</link>
        <pubDate>Thu, 04 Sep 2025 16:00:00 +0000</pubDate>
    </item>
</channel></rss>"#;

fn classifier() -> Arc<Classifier> {
    Arc::new(Classifier::new(&Rules::default()).unwrap())
}

fn fetcher() -> FeedFetcher {
    FeedFetcher::with_client(reqwest::Client::new(), RetryPolicy::immediate(3))
}

/// Source returning a fixed entry list, or failing outright.
struct StaticSource(Option<Vec<RawEntry>>);

#[async_trait]
impl EntrySource for StaticSource {
    async fn fetch_entries(&self, sources: &[String]) -> Result<Vec<RawEntry>, FetchError> {
        self.0
            .clone()
            .ok_or(FetchError::AllSourcesFailed(sources.len()))
    }
}

fn raw(title: &str, link: &str) -> RawEntry {
    RawEntry {
        title: title.to_string(),
        link: link.to_string(),
        summary: None,
        published: None,
    }
}

async fn denied_and_valid_sources() -> (MockServer, Vec<String>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SILKSONG_RSS)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(&server)
        .await;
    let sources = vec![
        format!("{}/blocked", server.uri()),
        format!("{}/feed", server.uri()),
    ];
    (server, sources)
}

#[tokio::test]
async fn test_denied_source_falls_back_and_new_article_is_sent() {
    let (_server, sources) = denied_and_valid_sources().await;
    let fetcher = fetcher();
    let store = MemorySeenStore::default();
    let mailer = RecordingMailer::new();

    let report = Notifier {
        source: &fetcher,
        store: &store,
        mailer: &mailer,
        classifier: classifier(),
        sources: &sources,
        language: Language::Ko,
    }
    .run()
    .await;

    assert_eq!(report.articles.len(), 1);
    let article = &report.articles[0];
    assert_eq!(article.title, "Hollow Knight: Silksong Day One on Game Pass");
    assert!(article.is_addition);
    assert!(!article.is_removal);
    assert_eq!(report.delivery, Delivery::Sent);
    assert!(report.persisted);

    let expected: SeenSet = ["https://news.example.com/a".to_string()].into_iter().collect();
    assert_eq!(store.snapshot(), expected);
    assert_eq!(store.save_count(), 1);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, Language::Ko);
}

#[tokio::test]
async fn test_duplicate_entry_in_same_run_sent_once() {
    let source = StaticSource(Some(vec![
        raw("Coming to Game Pass: Hades II", "https://news.example.com/hades?ref=a"),
        raw("Coming to Game Pass: Hades II", "https://news.example.com/hades?ref=b"),
    ]));
    let store = MemorySeenStore::default();
    let mailer = RecordingMailer::new();

    let report = Notifier {
        source: &source,
        store: &store,
        mailer: &mailer,
        classifier: classifier(),
        sources: &[],
        language: Language::En,
    }
    .run()
    .await;

    assert_eq!(report.fetched, 2);
    assert_eq!(report.articles.len(), 1);
    assert_eq!(mailer.sent()[0].0.len(), 1);
}

#[tokio::test]
async fn test_all_sources_failing_sends_nothing_and_keeps_seen_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let sources = vec![format!("{}/one", server.uri()), format!("{}/two", server.uri())];

    let initial: SeenSet = ["https://news.example.com/old".to_string()].into_iter().collect();
    let fetcher = fetcher();
    let store = MemorySeenStore::new(initial.clone());
    let mailer = RecordingMailer::new();

    let report = Notifier {
        source: &fetcher,
        store: &store,
        mailer: &mailer,
        classifier: classifier(),
        sources: &sources,
        language: Language::Ko,
    }
    .run()
    .await;

    assert!(report.articles.is_empty());
    assert_eq!(report.delivery, Delivery::Skipped);
    assert!(mailer.sent().is_empty());
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.snapshot(), initial);
}

#[tokio::test]
async fn test_failed_delivery_still_marks_articles_seen() {
    let source = StaticSource(Some(vec![raw(
        "Leaving Game Pass in October",
        "https://news.example.com/leaving",
    )]));
    let store = MemorySeenStore::default();
    let mailer = RecordingMailer::failing();

    let report = Notifier {
        source: &source,
        store: &store,
        mailer: &mailer,
        classifier: classifier(),
        sources: &[],
        language: Language::Ko,
    }
    .run()
    .await;

    assert_eq!(report.delivery, Delivery::Failed);
    assert!(report.articles[0].is_removal);
    assert!(store.snapshot().contains("https://news.example.com/leaving"));
}

#[tokio::test]
async fn test_nothing_new_skips_email_but_saves() {
    let source = StaticSource(Some(vec![raw(
        "Xbox hardware sales update",
        "https://news.example.com/hw",
    )]));
    let store = MemorySeenStore::default();
    let mailer = RecordingMailer::new();

    let report = Notifier {
        source: &source,
        store: &store,
        mailer: &mailer,
        classifier: classifier(),
        sources: &[],
        language: Language::Ko,
    }
    .run()
    .await;

    assert_eq!(report.delivery, Delivery::NothingToSend);
    assert!(mailer.sent().is_empty());
    assert_eq!(store.save_count(), 1);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_second_run_does_not_renotify_from_file_store() {
    let dir = std::env::temp_dir().join("passwatch_run_test_two_runs");
    std::fs::remove_dir_all(&dir).ok();
    let store = JsonSeenStore::new(dir.join("seen_articles.json"));

    let (_server, sources) = denied_and_valid_sources().await;
    let fetcher = fetcher();
    let mailer = RecordingMailer::new();
    let notifier = Notifier {
        source: &fetcher,
        store: &store,
        mailer: &mailer,
        classifier: classifier(),
        sources: &sources[1..],
        language: Language::En,
    };

    let first = notifier.run().await;
    let second = notifier.run().await;

    assert_eq!(first.articles.len(), 1);
    assert!(second.articles.is_empty());
    assert_eq!(second.delivery, Delivery::NothingToSend);
    assert_eq!(mailer.sent().len(), 1);
    assert!(store.load().contains("https://news.example.com/a"));

    std::fs::remove_dir_all(&dir).ok();
}
