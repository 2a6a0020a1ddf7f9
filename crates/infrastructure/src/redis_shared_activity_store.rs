//! Redis-backed shared activity slot.
//!
//! Stores the last-activity instant as epoch milliseconds under a
//! session-scoped key with a safety TTL, so abandoned sessions do not leave
//! keys behind.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use clinicore_application::SharedActivityStore;
use clinicore_core::{AppError, AppResult};
use redis::aio::MultiplexedConnection;

/// Redis shared activity store implementation. One key per session.
#[derive(Clone)]
pub struct RedisSharedActivityStore {
    client: redis::Client,
    key: String,
    ttl: Duration,
}

impl RedisSharedActivityStore {
    /// Creates a store for one session key. `ttl` should comfortably exceed
    /// the session timeout.
    #[must_use]
    pub fn new(client: redis::Client, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            key: key.into(),
            ttl,
        }
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl SharedActivityStore for RedisSharedActivityStore {
    async fn get(&self) -> AppResult<Option<DateTime<Utc>>> {
        let mut connection = self.connection().await?;
        let millis: Option<i64> = redis::cmd("GET")
            .arg(&self.key)
            .query_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read shared activity key: {error}"))
            })?;

        millis
            .map(|value| {
                Utc.timestamp_millis_opt(value).single().ok_or_else(|| {
                    AppError::Internal(format!("invalid shared activity timestamp: {value}"))
                })
            })
            .transpose()
    }

    async fn set(&self, at: DateTime<Utc>) -> AppResult<()> {
        let mut connection = self.connection().await?;
        redis::cmd("SET")
            .arg(&self.key)
            .arg(at.timestamp_millis())
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async::<()>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write shared activity key: {error}"))
            })
    }

    async fn clear(&self) -> AppResult<()> {
        let mut connection = self.connection().await?;
        redis::cmd("DEL")
            .arg(&self.key)
            .query_async::<()>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear shared activity key: {error}"))
            })
    }
}
