use thiserror::Error;
use url::Url;

/// Errors produced when deriving an article identity or validating a source URL.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL has no host component (e.g. `mailto:`, `data:`).
    #[error("URL has no host: {0}")]
    MissingHost(String),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Maps an article link to its canonical identity: `scheme://host/path`.
///
/// Query string and fragment are dropped, so tracking parameters such as
/// `?utm_source=...` or `#comments` never make one article look like two.
/// A non-default port is preserved as part of the host.
///
/// The function is idempotent: normalizing a canonical id returns it unchanged.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidUrl`] for strings the URL parser rejects,
/// and [`NormalizeError::MissingHost`] for host-less URLs.
///
/// # Examples
///
/// ```
/// use passwatch::util::normalize_link;
///
/// let id = normalize_link("https://news.example.com/a?utm=1#top").unwrap();
/// assert_eq!(id, "https://news.example.com/a");
/// ```
pub fn normalize_link(link: &str) -> Result<String, NormalizeError> {
    let url = Url::parse(link.trim())?;

    let host = url
        .host_str()
        .ok_or_else(|| NormalizeError::MissingHost(link.to_owned()))?;

    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };

    Ok(format!("{}://{}{}", url.scheme(), authority, url.path()))
}

/// Validates a configured feed source URL.
///
/// Only `http` and `https` URLs with a host are accepted. Unlike article links,
/// source URLs keep their query string (WordPress feeds are often addressed as
/// `/?feed=rss2`).
pub fn validate_source_url(url_str: &str) -> Result<Url, NormalizeError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(NormalizeError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().is_none() {
        return Err(NormalizeError::MissingHost(url_str.to_owned()));
    }

    Ok(url)
}
