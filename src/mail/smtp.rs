use async_trait::async_trait;
use chrono::Local;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::time::Duration;

use super::{compose_digest, MailError, Mailer};
use crate::config::{Language, SmtpSettings};
use crate::pipeline::ClassifiedArticle;
use crate::retry::RetryPolicy;

const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Sends the digest through a lettre transport, retrying failed sends.
///
/// The default transport is an SMTP relay with STARTTLS and login
/// authentication, built by [`SmtpMailer::new`].
pub struct SmtpMailer<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
    to: Mailbox,
    retry: RetryPolicy,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, retry: RetryPolicy) -> Result<Self, MailError> {
        let from: Mailbox = settings.sender.parse()?;
        let to: Mailbox = settings.receiver.parse()?;

        let credentials = Credentials::new(
            settings.sender.clone(),
            settings.password.expose_secret().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self::with_transport(transport, from, to, retry))
    }
}

impl<T> SmtpMailer<T> {
    /// Mailer over an already-built transport.
    pub fn with_transport(transport: T, from: Mailbox, to: Mailbox, retry: RetryPolicy) -> Self {
        Self {
            transport,
            from,
            to,
            retry,
        }
    }
}

#[async_trait]
impl<T> Mailer for SmtpMailer<T>
where
    T: AsyncTransport + Send + Sync,
    T::Ok: Send,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    async fn send(
        &self,
        articles: &[ClassifiedArticle],
        language: Language,
    ) -> Result<(), MailError> {
        let digest = compose_digest(articles, language, Local::now());

        let mut attempt = 1;
        loop {
            let message = Message::builder()
                .from(self.from.clone())
                .to(self.to.clone())
                .subject(digest.subject.clone())
                .header(ContentType::TEXT_HTML)
                .body(digest.html.clone())?;

            match self.transport.send(message).await {
                Ok(_) => {
                    tracing::info!(articles = articles.len(), attempt = attempt, "Digest email sent");
                    return Ok(());
                }
                Err(e) if self.retry.has_next(attempt) => {
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "SMTP send failed, retrying"
                    );
                    self.retry.wait(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt = attempt, error = %e, "SMTP send failed");
                    return Err(MailError::Delivery {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}
