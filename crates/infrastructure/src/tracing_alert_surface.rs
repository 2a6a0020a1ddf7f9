//! Alert surface logging to tracing output. Stands in for a platform
//! pop-up in embedded and development contexts.

use async_trait::async_trait;
use clinicore_application::AlertSurface;
use clinicore_core::AppResult;
use clinicore_domain::Notification;
use tracing::info;

/// Always-permitted alert surface that logs presented alerts.
#[derive(Clone, Default)]
pub struct TracingAlertSurface;

impl TracingAlertSurface {
    /// Creates a new tracing alert surface.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSurface for TracingAlertSurface {
    async fn request_permission(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn present(&self, notification: &Notification) -> AppResult<()> {
        info!(
            id = %notification.id,
            priority = notification.priority.as_str(),
            title = notification.title,
            "interactive alert"
        );

        Ok(())
    }
}
