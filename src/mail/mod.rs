//! Digest delivery.
//!
//! The run only needs to know whether delivery succeeded; the seen set is
//! persisted either way.

mod compose;
mod smtp;

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

use crate::config::Language;
use crate::pipeline::ClassifiedArticle;

pub use compose::{compose_digest, Digest};
pub use smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Delivery failed after {attempts} attempt(s): {source}")]
    Delivery {
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Mail transport unavailable: {0}")]
    Unavailable(String),
}

/// Capability: deliver a digest of new articles.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, articles: &[ClassifiedArticle], language: Language)
        -> Result<(), MailError>;
}

/// Mailer that records digests instead of sending them. Can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(Vec<ClassifiedArticle>, Language)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Digests accepted so far (failed sends are not recorded).
    pub fn sent(&self) -> Vec<(Vec<ClassifiedArticle>, Language)> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        articles: &[ClassifiedArticle],
        language: Language,
    ) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Unavailable("recording mailer set to fail".into()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((articles.to_vec(), language));
        Ok(())
    }
}
