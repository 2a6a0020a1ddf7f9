//! Heartbeat transport pinging an HTTP liveness endpoint.

use async_trait::async_trait;
use clinicore_application::HeartbeatTransport;
use clinicore_core::{AppError, AppResult};

/// HTTP heartbeat transport implementation. The session manager swallows
/// ping failures; this adapter only reports them.
#[derive(Clone)]
pub struct HttpHeartbeatTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpHeartbeatTransport {
    /// Creates a transport posting to the given liveness URL.
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl HeartbeatTransport for HttpHeartbeatTransport {
    async fn ping(&self) -> AppResult<()> {
        self.client
            .post(&self.url)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("heartbeat request failed: {error}")))?
            .error_for_status()
            .map_err(|error| {
                AppError::Internal(format!("heartbeat endpoint rejected ping: {error}"))
            })?;

        Ok(())
    }
}
