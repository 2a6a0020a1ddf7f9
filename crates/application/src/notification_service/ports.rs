use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinicore_core::{AppError, AppResult, TenantId, UserId};
use clinicore_domain::{
    Notification, NotificationCategory, NotificationChannel, NotificationId, NotificationScope,
};

/// Filters applied when listing a recipient's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationQuery {
    /// Maximum rows returned, newest first.
    pub limit: usize,
    /// Include rows already marked read.
    pub include_read: bool,
    /// Include archived rows. Expired rows are excluded regardless.
    pub include_archived: bool,
    /// Restrict to one category.
    pub category: Option<NotificationCategory>,
}

impl Default for NotificationQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            include_read: true,
            include_archived: false,
            category: None,
        }
    }
}

impl NotificationQuery {
    /// Query matching only unread, unarchived rows.
    #[must_use]
    pub fn unread_only() -> Self {
        Self {
            include_read: false,
            ..Self::default()
        }
    }
}

/// Port for the notification backing store.
///
/// Every operation filters by tenant. Expired rows are excluded from reads
/// but never purged here; physical cleanup belongs to the store's owner.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persists a new notification row.
    async fn insert(&self, notification: Notification) -> AppResult<()>;

    /// Loads one row within a tenant.
    async fn find(
        &self,
        tenant_id: TenantId,
        id: NotificationId,
    ) -> AppResult<Option<Notification>>;

    /// Lists rows visible to the scope, newest first, capped at the query
    /// limit.
    async fn list_visible(
        &self,
        scope: &NotificationScope,
        query: &NotificationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Notification>>;

    /// Marks rows read, bumping `updated_at`. Returns the number changed.
    async fn mark_read(
        &self,
        tenant_id: TenantId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Marks rows archived, bumping `updated_at`. Returns the number changed.
    async fn mark_archived(
        &self,
        tenant_id: TenantId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Deletes one row.
    async fn delete(&self, tenant_id: TenantId, id: NotificationId) -> AppResult<()>;

    /// Counts unread, unarchived, unexpired rows visible to the scope.
    async fn count_unread(
        &self,
        scope: &NotificationScope,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;
}

/// Row-level change kind reported by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFeedEventKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl ChangeFeedEventKind {
    /// Returns a stable wire value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parses a wire value into a change kind.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown change feed event kind '{value}'"
            ))),
        }
    }
}

/// One change-feed event carrying the affected row (its last known value
/// for deletes). The feed is not assumed tenant-scoped; consumers re-filter.
#[derive(Debug, Clone)]
pub struct ChangeFeedEvent {
    /// What happened to the row.
    pub kind: ChangeFeedEventKind,
    /// The affected row.
    pub notification: Notification,
}

/// Push stream of notification-table changes. Best effort, at-least-once.
#[async_trait]
pub trait NotificationChangeFeed: Send {
    /// Waits for the next event; `None` once the feed has ended.
    async fn next_event(&mut self) -> AppResult<Option<ChangeFeedEvent>>;
}

/// Outbound delivery channel for one transport (email, SMS, push).
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this sender covers.
    fn channel(&self) -> NotificationChannel;

    /// Delivers one fully-formed notification over the channel.
    async fn deliver(&self, notification: &Notification) -> AppResult<()>;
}

/// Directory resolving a recipient's deliverable addresses. Used by channel
/// sender implementations; broadcast rows have no single address and are
/// skipped by address-bound senders.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Email address for a user, if known.
    async fn email_address(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> AppResult<Option<String>>;

    /// SMS-capable phone number for a user, if known.
    async fn phone_number(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> AppResult<Option<String>>;
}

/// Permission-gated interactive alert surface for urgent items.
#[async_trait]
pub trait AlertSurface: Send + Sync {
    /// Asks the platform for alert permission. The service calls this at
    /// most once and treats denial as a silent no-op.
    async fn request_permission(&self) -> AppResult<bool>;

    /// Presents one alert. Only called after permission was granted.
    async fn present(&self, notification: &Notification) -> AppResult<()>;
}
