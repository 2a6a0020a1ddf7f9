//! Email channel sender using the `lettre` crate.

use std::sync::Arc;

use async_trait::async_trait;
use clinicore_application::{ChannelSender, RecipientDirectory};
use clinicore_core::{AppError, AppResult};
use clinicore_domain::{Notification, NotificationChannel};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// SMTP sender configuration.
#[derive(Clone)]
pub struct SmtpSenderConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Sender email address.
    pub from_address: String,
}

/// Email channel sender over SMTP. Broadcast notifications have no single
/// address and are skipped.
#[derive(Clone)]
pub struct SmtpEmailSender {
    config: SmtpSenderConfig,
    directory: Arc<dyn RecipientDirectory>,
}

impl SmtpEmailSender {
    /// Creates a sender from SMTP configuration and a recipient directory.
    #[must_use]
    pub fn new(config: SmtpSenderConfig, directory: Arc<dyn RecipientDirectory>) -> Self {
        Self { config, directory }
    }
}

#[async_trait]
impl ChannelSender for SmtpEmailSender {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Email
    }

    async fn deliver(&self, notification: &Notification) -> AppResult<()> {
        let Some(recipient_id) = notification.recipient_id else {
            debug!(id = %notification.id, "skipping email for broadcast notification");
            return Ok(());
        };

        let Some(address) = self
            .directory
            .email_address(notification.tenant_id, recipient_id)
            .await?
        else {
            debug!(id = %notification.id, "recipient has no email address");
            return Ok(());
        };

        let from = self
            .config
            .from_address
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid from address: {error}")))?;
        let to = address
            .parse()
            .map_err(|error| AppError::Internal(format!("invalid recipient address: {error}")))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(notification.title.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.message.clone())
            .map_err(|error| AppError::Internal(format!("failed to build email: {error}")))?;

        let credentials =
            Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            .map_err(|error| {
                AppError::Internal(format!("failed to create SMTP transport: {error}"))
            })?
            .port(self.config.port)
            .credentials(credentials)
            .build();

        mailer
            .send(message)
            .await
            .map_err(|error| AppError::Internal(format!("failed to send email: {error}")))?;

        Ok(())
    }
}
