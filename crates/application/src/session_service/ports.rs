use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinicore_core::AppResult;

/// Shared, process-external slot holding a session's most recent activity.
///
/// Every browsing context of one session points at the same slot, so all of
/// them observe a single inactivity clock instead of expiring independently.
#[async_trait]
pub trait SharedActivityStore: Send + Sync {
    /// Reads the most recent recorded activity, if any.
    async fn get(&self) -> AppResult<Option<DateTime<Utc>>>;

    /// Records an activity timestamp.
    async fn set(&self, at: DateTime<Utc>) -> AppResult<()>;

    /// Removes the slot.
    async fn clear(&self) -> AppResult<()>;
}

/// Liveness transport pinged while the session is active and visible.
/// Failures never affect the local inactivity clock.
#[async_trait]
pub trait HeartbeatTransport: Send + Sync {
    /// Sends one liveness ping.
    async fn ping(&self) -> AppResult<()>;
}

/// Callbacks driven by the session state machine. The caller decides the UI
/// treatment for both.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    /// Invoked once when the warning window opens.
    async fn on_warning(&self);

    /// Invoked once when the session expires from inactivity. The caller is
    /// expected to clear client-held credentials and redirect to
    /// re-authentication.
    async fn on_timeout(&self);
}
