//! SMS channel sender posting to an HTTP gateway.

use std::sync::Arc;

use async_trait::async_trait;
use clinicore_application::{ChannelSender, RecipientDirectory};
use clinicore_core::{AppError, AppResult};
use clinicore_domain::{Notification, NotificationChannel};
use tracing::debug;

/// SMS channel sender over an HTTP gateway. Broadcast notifications have no
/// single phone number and are skipped.
#[derive(Clone)]
pub struct HttpSmsSender {
    client: reqwest::Client,
    gateway_url: String,
    directory: Arc<dyn RecipientDirectory>,
}

impl HttpSmsSender {
    /// Creates a sender posting to the given gateway URL.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        gateway_url: impl Into<String>,
        directory: Arc<dyn RecipientDirectory>,
    ) -> Self {
        Self {
            client,
            gateway_url: gateway_url.into(),
            directory,
        }
    }
}

#[async_trait]
impl ChannelSender for HttpSmsSender {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Sms
    }

    async fn deliver(&self, notification: &Notification) -> AppResult<()> {
        let Some(recipient_id) = notification.recipient_id else {
            debug!(id = %notification.id, "skipping SMS for broadcast notification");
            return Ok(());
        };

        let Some(phone_number) = self
            .directory
            .phone_number(notification.tenant_id, recipient_id)
            .await?
        else {
            debug!(id = %notification.id, "recipient has no phone number");
            return Ok(());
        };

        self.client
            .post(&self.gateway_url)
            .json(&serde_json::json!({
                "to": phone_number,
                "body": format!("{}: {}", notification.title, notification.message),
            }))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("SMS gateway request failed: {error}")))?
            .error_for_status()
            .map_err(|error| {
                AppError::Internal(format!("SMS gateway rejected message: {error}"))
            })?;

        Ok(())
    }
}
