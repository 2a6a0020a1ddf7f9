//! Console channel sender for development. Logs deliveries to tracing
//! output instead of contacting a gateway.

use async_trait::async_trait;
use clinicore_application::ChannelSender;
use clinicore_core::AppResult;
use clinicore_domain::{Notification, NotificationChannel};
use tracing::info;

/// Development sender standing in for any outbound channel.
#[derive(Clone)]
pub struct ConsoleChannelSender {
    channel: NotificationChannel,
}

impl ConsoleChannelSender {
    /// Creates a console sender for the given channel.
    #[must_use]
    pub fn new(channel: NotificationChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelSender for ConsoleChannelSender {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn deliver(&self, notification: &Notification) -> AppResult<()> {
        info!(
            channel = self.channel.as_str(),
            id = %notification.id,
            title = notification.title,
            "--- NOTIFICATION (console) ---\n{}\n--- END NOTIFICATION ---",
            notification.message
        );

        Ok(())
    }
}
