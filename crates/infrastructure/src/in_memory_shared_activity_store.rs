//! In-memory shared activity slot for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinicore_application::SharedActivityStore;
use clinicore_core::AppResult;
use tokio::sync::RwLock;

/// In-memory shared activity store implementation. Share one instance
/// between the session contexts that should expire together.
#[derive(Debug, Default)]
pub struct InMemorySharedActivityStore {
    value: RwLock<Option<DateTime<Utc>>>,
}

impl InMemorySharedActivityStore {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedActivityStore for InMemorySharedActivityStore {
    async fn get(&self) -> AppResult<Option<DateTime<Utc>>> {
        Ok(*self.value.read().await)
    }

    async fn set(&self, at: DateTime<Utc>) -> AppResult<()> {
        *self.value.write().await = Some(at);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.value.write().await = None;
        Ok(())
    }
}
