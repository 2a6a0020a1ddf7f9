//! PostgreSQL-backed notification store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinicore_application::{NotificationQuery, NotificationStore};
use clinicore_core::{AppError, AppResult, TenantId, UserId};
use clinicore_domain::{
    Notification, NotificationAction, NotificationCategory, NotificationChannel, NotificationId,
    NotificationPriority, NotificationScope,
};
use sqlx::{FromRow, PgPool};

/// PostgreSQL notification store implementation. Every statement filters by
/// tenant.
#[derive(Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    recipient_id: Option<uuid::Uuid>,
    kind: String,
    title: String,
    message: String,
    data: Option<serde_json::Value>,
    priority: String,
    category: String,
    channels: Vec<String>,
    is_read: bool,
    is_archived: bool,
    expires_at: Option<DateTime<Utc>>,
    scheduled_for: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    actions: serde_json::Value,
}

impl NotificationRow {
    fn into_notification(self) -> AppResult<Notification> {
        let channels = self
            .channels
            .iter()
            .map(|value| NotificationChannel::from_str(value))
            .collect::<AppResult<Vec<NotificationChannel>>>()?;
        let actions: Vec<NotificationAction> =
            serde_json::from_value(self.actions).map_err(|error| {
                AppError::Internal(format!("malformed notification actions column: {error}"))
            })?;

        Ok(Notification {
            id: NotificationId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            recipient_id: self.recipient_id.map(UserId::from_uuid),
            kind: self.kind,
            title: self.title,
            message: self.message,
            data: self.data,
            priority: NotificationPriority::from_str(&self.priority)?,
            category: NotificationCategory::from_str(&self.category)?,
            channels,
            is_read: self.is_read,
            is_archived: self.is_archived,
            expires_at: self.expires_at,
            scheduled_for: self.scheduled_for,
            created_at: self.created_at,
            updated_at: self.updated_at,
            actions,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id,
    tenant_id,
    recipient_id,
    kind,
    title,
    message,
    data,
    priority,
    category,
    channels,
    is_read,
    is_archived,
    expires_at,
    scheduled_for,
    created_at,
    updated_at,
    actions
"#;

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn insert(&self, notification: Notification) -> AppResult<()> {
        let channels: Vec<String> = notification
            .channels
            .iter()
            .map(|channel| channel.as_str().to_owned())
            .collect();
        let actions = serde_json::to_value(&notification.actions).map_err(|error| {
            AppError::Internal(format!("failed to encode notification actions: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id,
                tenant_id,
                recipient_id,
                kind,
                title,
                message,
                data,
                priority,
                category,
                channels,
                is_read,
                is_archived,
                expires_at,
                scheduled_for,
                created_at,
                updated_at,
                actions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.tenant_id.as_uuid())
        .bind(notification.recipient_id.map(|recipient| recipient.as_uuid()))
        .bind(notification.kind)
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.data)
        .bind(notification.priority.as_str())
        .bind(notification.category.as_str())
        .bind(channels)
        .bind(notification.is_read)
        .bind(notification.is_archived)
        .bind(notification.expires_at)
        .bind(notification.scheduled_for)
        .bind(notification.created_at)
        .bind(notification.updated_at)
        .bind(actions)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert notification: {error}")))?;

        Ok(())
    }

    async fn find(
        &self,
        tenant_id: TenantId,
        id: NotificationId,
    ) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load notification: {error}")))?;

        row.map(NotificationRow::into_notification).transpose()
    }

    async fn list_visible(
        &self,
        scope: &NotificationScope,
        query: &NotificationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Notification>> {
        let capped_limit = query.limit.clamp(1, 200) as i64;
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM notifications
            WHERE tenant_id = $1
                AND (recipient_id IS NULL OR recipient_id = $2)
                AND (expires_at IS NULL OR expires_at > $3)
                AND ($4 OR NOT is_read)
                AND ($5 OR NOT is_archived)
                AND ($6::TEXT IS NULL OR category = $6)
            ORDER BY created_at DESC
            LIMIT $7
            "#
        ))
        .bind(scope.tenant_id.as_uuid())
        .bind(scope.recipient_id.as_uuid())
        .bind(now)
        .bind(query.include_read)
        .bind(query.include_archived)
        .bind(query.category.map(|category| category.as_str()))
        .bind(capped_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list notifications: {error}")))?;

        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    async fn mark_read(
        &self,
        tenant_id: TenantId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let id_values: Vec<uuid::Uuid> = ids.iter().map(NotificationId::as_uuid).collect();
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, updated_at = $3
            WHERE tenant_id = $1 AND id = ANY($2) AND NOT is_read
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id_values)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to mark notifications read: {error}"))
        })?;

        Ok(result.rows_affected())
    }

    async fn mark_archived(
        &self,
        tenant_id: TenantId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let id_values: Vec<uuid::Uuid> = ids.iter().map(NotificationId::as_uuid).collect();
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_archived = TRUE, updated_at = $3
            WHERE tenant_id = $1 AND id = ANY($2) AND NOT is_archived
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id_values)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to archive notifications: {error}"))
        })?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, tenant_id: TenantId, id: NotificationId) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete notification: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "notification '{id}' does not exist for tenant '{tenant_id}'"
            )));
        }

        Ok(())
    }

    async fn count_unread(
        &self,
        scope: &NotificationScope,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE tenant_id = $1
                AND (recipient_id IS NULL OR recipient_id = $2)
                AND (expires_at IS NULL OR expires_at > $3)
                AND NOT is_read
                AND NOT is_archived
            "#,
        )
        .bind(scope.tenant_id.as_uuid())
        .bind(scope.recipient_id.as_uuid())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count unread notifications: {error}"))
        })?;

        Ok(count.max(0) as u64)
    }
}
