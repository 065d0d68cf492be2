//! Run configuration: environment settings and the matching rules file.
//!
//! Environment settings are required and fail fast. The rules file
//! (`gamepass_config.json` by default) is optional: a missing, unreadable or
//! invalid file yields the built-in rules with a logged warning.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::DEFAULT_SOURCES;
use crate::retry::RetryPolicy;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in rules file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rules file too large: {0}")]
    TooLarge(String),

    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// ============================================================================
// Environment Settings
// ============================================================================

/// Digest language selected by `EMAIL_LANG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ko" => Some(Language::Ko),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

/// SMTP connection and addressing settings.
///
/// Debug output masks the password.
#[derive(Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub sender: String,
    pub password: SecretString,
    pub receiver: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"[REDACTED]")
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// Everything a run needs, constructed once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Settings {
    pub smtp: SmtpSettings,
    pub language: Language,
    pub rules_path: PathBuf,
    pub seen_path: PathBuf,
    pub sources: Vec<String>,
    pub fetch_retry: RetryPolicy,
}

impl Settings {
    pub const DEFAULT_RULES_FILE: &'static str = "gamepass_config.json";
    pub const DEFAULT_SEEN_FILE: &'static str = "seen_articles.json";

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(SettingsError::Missing(key));

        let port_raw = require("SMTP_PORT")?;
        let port = port_raw
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| SettingsError::Invalid {
                name: "SMTP_PORT",
                reason: format!("expected a positive integer, got {port_raw:?}"),
            })?;

        let smtp = SmtpSettings {
            server: require("SMTP_SERVER")?.trim().to_string(),
            port,
            sender: require("SENDER_EMAIL")?.trim().to_string(),
            password: SecretString::from(require("SENDER_PASSWORD")?),
            receiver: require("RECEIVER_EMAIL")?.trim().to_string(),
        };

        let language = match get("EMAIL_LANG") {
            None => Language::default(),
            Some(raw) => Language::parse(&raw).ok_or_else(|| SettingsError::Invalid {
                name: "EMAIL_LANG",
                reason: format!("expected \"ko\" or \"en\", got {raw:?}"),
            })?,
        };

        let sources = match get("FEED_URLS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => owned(DEFAULT_SOURCES),
        };

        let mut fetch_retry = RetryPolicy::default();
        if let Some(raw) = get("FETCH_RETRIES") {
            let attempts = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| SettingsError::Invalid {
                    name: "FETCH_RETRIES",
                    reason: format!("expected a positive integer, got {raw:?}"),
                })?;
            fetch_retry.max_attempts = attempts;
        }

        Ok(Self {
            smtp,
            language,
            rules_path: PathBuf::from(
                get("GAMEPASS_CONFIG").unwrap_or_else(|| Self::DEFAULT_RULES_FILE.to_string()),
            ),
            seen_path: PathBuf::from(
                get("SEEN_ARTICLES_FILE").unwrap_or_else(|| Self::DEFAULT_SEEN_FILE.to_string()),
            ),
            sources,
            fetch_retry,
        })
    }
}

// ============================================================================
// Matching Rules
// ============================================================================

const DEFAULT_KEYWORDS: &[&str] = &[
    "game pass",
    "gamepass",
    "xbox game pass",
    "coming to game pass",
    "leaving game pass",
    "available now on game pass",
    "pc game pass",
    "joins game pass",
    "say goodbye",
];

const DEFAULT_ADD_PATTERNS: &[&str] = &[
    r"coming to (?:xbox )?game pass",
    r"available (?:now )?(?:on|in) (?:xbox )?game pass",
    r"joins? (?:xbox )?game pass",
    r"new.*(?:xbox )?game pass",
    r"day one (?:on|with) (?:xbox )?game pass",
];

const DEFAULT_REMOVE_PATTERNS: &[&str] = &[
    r"leaving (?:xbox )?game pass",
    r"last chance.*(?:xbox )?game pass",
    r"say goodbye",
    r"final days",
];

/// Keyword and pattern lists driving relevance and classification.
///
/// Keys missing from the file fall back to the built-in list for that key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Rules {
    #[serde(rename = "gamepass_keywords")]
    pub keywords: Vec<String>,
    pub add_patterns: Vec<String>,
    pub remove_patterns: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            keywords: owned(DEFAULT_KEYWORDS),
            add_patterns: owned(DEFAULT_ADD_PATTERNS),
            remove_patterns: owned(DEFAULT_REMOVE_PATTERNS),
        }
    }
}

impl Rules {
    /// Maximum rules file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load rules from a JSON file.
    ///
    /// - Missing file → `Ok(Rules::default())`
    /// - Empty file → `Ok(Rules::default())`
    /// - Invalid JSON → `Err(RulesError::Parse)`
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(RulesError::TooLarge(format!(
                    "Rules file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No rules file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(RulesError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Rules file is empty, using defaults");
            return Ok(Self::default());
        }

        let rules: Rules = serde_json::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            keywords = rules.keywords.len(),
            add_patterns = rules.add_patterns.len(),
            remove_patterns = rules.remove_patterns.len(),
            "Loaded matching rules"
        );
        Ok(rules)
    }
}

// ============================================================================
// Tests
// ============================================================================
