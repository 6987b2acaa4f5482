//! Outgoing mail.
//!
//! Commands only see the [`EmailSender`] trait; [`SmtpEmailSender`] is the
//! production implementation.

pub mod templates;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;
use crate::error::{AppError, Result};

/// Delivers a single HTML message.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// SMTP delivery through a STARTTLS relay.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Creates a new `SmtpEmailSender`.
    ///
    /// # Arguments
    ///
    /// * `config` - The SMTP settings.
    ///
    /// # Returns
    ///
    /// A `Result` containing the sender, or an error if the relay or the
    /// sender address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid MAIL_FROM: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Email(format!("Invalid SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.as_str().to_owned(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AppError::Email(format!("Message build failed: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(format!("SMTP send failed: {}", e)))?;

        tracing::info!("📧 Email sent: {}", subject);
        Ok(())
    }
}
