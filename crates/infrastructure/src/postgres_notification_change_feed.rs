//! Change feed over PostgreSQL `LISTEN`/`NOTIFY`.
//!
//! The database is expected to notify a channel with a JSON payload of
//! `{"kind": "insert|update|delete", "notification": {...}}` for every row
//! change (typically from a trigger). Delivery is best effort.

use async_trait::async_trait;
use clinicore_application::{ChangeFeedEvent, ChangeFeedEventKind, NotificationChangeFeed};
use clinicore_core::{AppError, AppResult};
use clinicore_domain::Notification;
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;

/// PostgreSQL notification change feed implementation.
pub struct PostgresNotificationChangeFeed {
    listener: PgListener,
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    kind: String,
    notification: Notification,
}

impl PostgresNotificationChangeFeed {
    /// Connects a listener on the given notify channel.
    pub async fn connect(pool: &PgPool, channel: &str) -> AppResult<Self> {
        let mut listener = PgListener::connect_with(pool).await.map_err(|error| {
            AppError::Internal(format!("failed to open change feed listener: {error}"))
        })?;
        listener.listen(channel).await.map_err(|error| {
            AppError::Internal(format!("failed to listen on channel '{channel}': {error}"))
        })?;

        Ok(Self { listener })
    }
}

#[async_trait]
impl NotificationChangeFeed for PostgresNotificationChangeFeed {
    async fn next_event(&mut self) -> AppResult<Option<ChangeFeedEvent>> {
        let message = self.listener.recv().await.map_err(|error| {
            AppError::Internal(format!("change feed listener failed: {error}"))
        })?;

        let payload: ChangePayload =
            serde_json::from_str(message.payload()).map_err(|error| {
                AppError::Internal(format!("malformed change feed payload: {error}"))
            })?;

        Ok(Some(ChangeFeedEvent {
            kind: ChangeFeedEventKind::parse(&payload.kind)?,
            notification: payload.notification,
        }))
    }
}
