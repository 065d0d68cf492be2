use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::feed::headers::browser_headers;
use crate::feed::parser::{parse_feed, validate_markup, ParseResult, RawEntry};
use crate::retry::RetryPolicy;
use crate::util::validate_source_url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching feed sources.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a non-2xx status code other than an access denial
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// 401/403: the source refuses us, retrying is pointless
    #[error("Access denied: status {0}")]
    Forbidden(u16),
    /// Request exceeded the per-attempt timeout
    #[error("Request timed out")]
    Timeout,
    /// Body is not well-formed feed markup, or feed-rs rejected it
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Configured source is not a usable http(s) URL
    #[error("Invalid source URL: {0}")]
    InvalidSource(String),
    /// Every configured source failed
    #[error("All {0} feed source(s) failed")]
    AllSourcesFailed(usize),
}

impl FetchError {
    /// Returns true if another attempt against the same source may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_)
            | FetchError::HttpStatus(_)
            | FetchError::Timeout
            | FetchError::Parse(_)
            | FetchError::IncompleteResponse { .. } => true,
            FetchError::Forbidden(_)
            | FetchError::ResponseTooLarge
            | FetchError::InvalidSource(_)
            | FetchError::AllSourcesFailed(_) => false,
        }
    }
}

/// Capability: produce the merged entry list for a run.
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Fetch every source in order and concatenate their entries.
    ///
    /// Fails only when no source could be fetched.
    async fn fetch_entries(&self, sources: &[String]) -> Result<Vec<RawEntry>, FetchError>;
}

/// HTTP feed fetcher with per-source retry and fallback to the next source.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    timeout: Duration,
    head_precheck: bool,
}

impl FeedFetcher {
    /// Creates a fetcher with its own HTTP client.
    pub fn new(retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, retry))
    }

    /// Creates a fetcher around a caller-configured client.
    pub fn with_client(client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            timeout: DEFAULT_TIMEOUT,
            head_precheck: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a HEAD request before the first GET of each source. A 401/403 on
    /// HEAD abandons the source; any other HEAD outcome falls through to GET.
    pub fn with_head_precheck(mut self, enabled: bool) -> Self {
        self.head_precheck = enabled;
        self
    }

    /// Fetches all sources in order. See [`EntrySource::fetch_entries`].
    ///
    /// # Behavior
    ///
    /// - Sources are tried sequentially; entries are concatenated in source order
    /// - A failing source is logged and skipped, the rest are still fetched
    /// - No deduplication across sources happens here
    /// - An empty source list counts as every source failing
    pub async fn fetch_all(&self, sources: &[String]) -> Result<Vec<RawEntry>, FetchError> {
        let mut entries = Vec::new();
        let mut succeeded = 0usize;

        for source in sources {
            match self.fetch_source(source).await {
                Ok(mut found) => {
                    succeeded += 1;
                    entries.append(&mut found);
                }
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Feed source abandoned");
                }
            }
        }

        if succeeded == 0 {
            tracing::error!(sources = sources.len(), "Every feed source failed");
            return Err(FetchError::AllSourcesFailed(sources.len()));
        }

        tracing::info!(
            sources = sources.len(),
            succeeded = succeeded,
            entries = entries.len(),
            "Feed fetch complete"
        );
        Ok(entries)
    }

    /// Fetches one source, retrying retryable failures under the retry policy.
    pub async fn fetch_source(&self, source: &str) -> Result<Vec<RawEntry>, FetchError> {
        let url = validate_source_url(source)
            .map_err(|e| FetchError::InvalidSource(format!("{source}: {e}")))?;

        if self.head_precheck {
            self.precheck(&url).await?;
        }

        let mut attempt = 1;
        loop {
            match self.attempt(&url, attempt).await {
                Ok(ParseResult { entries, skipped }) => {
                    if skipped > 0 {
                        tracing::warn!(
                            source = %url,
                            skipped = skipped,
                            "Feed items without a link skipped"
                        );
                    }
                    tracing::debug!(
                        source = %url,
                        attempt = attempt,
                        entries = entries.len(),
                        "Feed fetched"
                    );
                    return Ok(entries);
                }
                Err(e) if e.is_retryable() && self.retry.has_next(attempt) => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        source = %url,
                        attempt = attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Feed fetch failed, retrying"
                    );
                    self.retry.wait(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        source = %url,
                        attempt = attempt,
                        error = %e,
                        "Feed fetch failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn precheck(&self, url: &Url) -> Result<(), FetchError> {
        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .head(url.as_str())
                .headers(browser_headers(1))
                .send(),
        )
        .await;

        match response {
            Ok(Ok(resp)) if is_access_denied(resp.status()) => {
                Err(FetchError::Forbidden(resp.status().as_u16()))
            }
            Ok(Ok(resp)) => {
                tracing::debug!(source = %url, status = %resp.status(), "HEAD pre-check passed");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::debug!(source = %url, error = %e, "HEAD pre-check failed, trying GET");
                Ok(())
            }
            Err(_) => {
                tracing::debug!(source = %url, "HEAD pre-check timed out, trying GET");
                Ok(())
            }
        }
    }

    async fn attempt(&self, url: &Url, attempt: u32) -> Result<ParseResult, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.download(url, attempt))
            .await
            .map_err(|_| FetchError::Timeout)??;

        validate_markup(&bytes).map_err(FetchError::Parse)?;
        parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn download(&self, url: &Url, attempt: u32) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .headers(browser_headers(attempt))
            .send()
            .await?;

        let status = response.status();
        if is_access_denied(status) {
            return Err(FetchError::Forbidden(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

#[async_trait]
impl EntrySource for FeedFetcher {
    async fn fetch_entries(&self, sources: &[String]) -> Result<Vec<RawEntry>, FetchError> {
        self.fetch_all(sources).await
    }
}

fn is_access_denied(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
