//! Push channel sender posting to an HTTP push gateway.

use async_trait::async_trait;
use clinicore_application::ChannelSender;
use clinicore_core::{AppError, AppResult};
use clinicore_domain::{Notification, NotificationChannel};

/// Push channel sender over an HTTP gateway. The gateway resolves device
/// registrations, so tenant broadcasts are forwarded as-is.
#[derive(Clone)]
pub struct HttpPushSender {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpPushSender {
    /// Creates a sender posting to the given gateway URL.
    #[must_use]
    pub fn new(client: reqwest::Client, gateway_url: impl Into<String>) -> Self {
        Self {
            client,
            gateway_url: gateway_url.into(),
        }
    }
}

#[async_trait]
impl ChannelSender for HttpPushSender {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Push
    }

    async fn deliver(&self, notification: &Notification) -> AppResult<()> {
        self.client
            .post(&self.gateway_url)
            .json(&serde_json::json!({
                "tenant_id": notification.tenant_id,
                "recipient_id": notification.recipient_id,
                "title": notification.title,
                "body": notification.message,
                "priority": notification.priority.as_str(),
                "data": notification.data,
            }))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("push gateway request failed: {error}")))?
            .error_for_status()
            .map_err(|error| {
                AppError::Internal(format!("push gateway rejected message: {error}"))
            })?;

        Ok(())
    }
}
