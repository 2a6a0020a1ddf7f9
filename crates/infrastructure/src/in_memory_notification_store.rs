//! In-memory notification store with a broadcast change feed. Backs tests
//! and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinicore_application::{
    ChangeFeedEvent, ChangeFeedEventKind, NotificationChangeFeed, NotificationQuery,
    NotificationStore,
};
use clinicore_core::{AppError, AppResult, TenantId};
use clinicore_domain::{Notification, NotificationId, NotificationScope};
use tokio::sync::{RwLock, broadcast};

/// In-memory notification store implementation.
pub struct InMemoryNotificationStore {
    rows: RwLock<HashMap<(TenantId, NotificationId), Notification>>,
    changes: broadcast::Sender<ChangeFeedEvent>,
}

impl InMemoryNotificationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            rows: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Opens a change feed over this store's mutations. Events published
    /// before the call are not replayed.
    #[must_use]
    pub fn change_feed(&self) -> InMemoryChangeFeed {
        InMemoryChangeFeed {
            receiver: self.changes.subscribe(),
        }
    }

    fn publish(&self, kind: ChangeFeedEventKind, notification: Notification) {
        // A send error only means no feed is currently open.
        let _unsubscribed = self.changes.send(ChangeFeedEvent { kind, notification });
    }
}

impl Default for InMemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> AppResult<()> {
        let key = (notification.tenant_id, notification.id);
        let mut rows = self.rows.write().await;

        if rows.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "notification '{}' already exists for tenant '{}'",
                key.1, key.0
            )));
        }

        rows.insert(key, notification.clone());
        drop(rows);

        self.publish(ChangeFeedEventKind::Insert, notification);
        Ok(())
    }

    async fn find(
        &self,
        tenant_id: TenantId,
        id: NotificationId,
    ) -> AppResult<Option<Notification>> {
        Ok(self.rows.read().await.get(&(tenant_id, id)).cloned())
    }

    async fn list_visible(
        &self,
        scope: &NotificationScope,
        query: &NotificationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let mut listed: Vec<Notification> = rows
            .values()
            .filter(|row| {
                scope.matches(row)
                    && !row.is_expired(now)
                    && (query.include_read || !row.is_read)
                    && (query.include_archived || !row.is_archived)
                    && query
                        .category
                        .is_none_or(|category| row.category == category)
            })
            .cloned()
            .collect();

        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        listed.truncate(query.limit);

        Ok(listed)
    }

    async fn mark_read(
        &self,
        tenant_id: TenantId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut updated = Vec::new();
        {
            let mut rows = self.rows.write().await;
            for id in ids {
                if let Some(row) = rows.get_mut(&(tenant_id, *id))
                    && !row.is_read
                {
                    row.is_read = true;
                    row.updated_at = now;
                    updated.push(row.clone());
                }
            }
        }

        let changed = updated.len() as u64;
        for row in updated {
            self.publish(ChangeFeedEventKind::Update, row);
        }

        Ok(changed)
    }

    async fn mark_archived(
        &self,
        tenant_id: TenantId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut updated = Vec::new();
        {
            let mut rows = self.rows.write().await;
            for id in ids {
                if let Some(row) = rows.get_mut(&(tenant_id, *id))
                    && !row.is_archived
                {
                    row.is_archived = true;
                    row.updated_at = now;
                    updated.push(row.clone());
                }
            }
        }

        let changed = updated.len() as u64;
        for row in updated {
            self.publish(ChangeFeedEventKind::Update, row);
        }

        Ok(changed)
    }

    async fn delete(&self, tenant_id: TenantId, id: NotificationId) -> AppResult<()> {
        let removed = self.rows.write().await.remove(&(tenant_id, id));

        let Some(row) = removed else {
            return Err(AppError::NotFound(format!(
                "notification '{id}' does not exist for tenant '{tenant_id}'"
            )));
        };

        self.publish(ChangeFeedEventKind::Delete, row);
        Ok(())
    }

    async fn count_unread(
        &self,
        scope: &NotificationScope,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| {
                scope.matches(row) && !row.is_expired(now) && !row.is_read && !row.is_archived
            })
            .count() as u64)
    }
}

/// Broadcast-backed change feed over an in-memory store.
pub struct InMemoryChangeFeed {
    receiver: broadcast::Receiver<ChangeFeedEvent>,
}

#[async_trait]
impl NotificationChangeFeed for InMemoryChangeFeed {
    async fn next_event(&mut self) -> AppResult<Option<ChangeFeedEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change feed lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};
    use clinicore_application::{
        AlertSurface, AuditService, AuditStore, ClientContext, ClientContextResolver,
        NotificationQuery, NotificationService, NotificationStore,
    };
    use clinicore_core::{AppResult, TenantId, UserId};
    use clinicore_domain::{
        AuditRecord, Notification, NotificationCategory, NotificationDraft, NotificationScope,
    };

    use super::InMemoryNotificationStore;

    struct NullAuditStore;

    #[async_trait]
    impl AuditStore for NullAuditStore {
        async fn append(&self, _record: AuditRecord) -> AppResult<()> {
            Ok(())
        }
    }

    struct NullResolver;

    #[async_trait]
    impl ClientContextResolver for NullResolver {
        async fn resolve(&self) -> AppResult<ClientContext> {
            Ok(ClientContext::unknown())
        }
    }

    struct NullAlertSurface;

    #[async_trait]
    impl AlertSurface for NullAlertSurface {
        async fn request_permission(&self) -> AppResult<bool> {
            Ok(false)
        }

        async fn present(&self, _notification: &Notification) -> AppResult<()> {
            Ok(())
        }
    }

    fn service_over(store: Arc<InMemoryNotificationStore>) -> NotificationService {
        NotificationService::new(
            store,
            Vec::new(),
            Arc::new(NullAlertSurface),
            AuditService::new(Arc::new(NullAuditStore), Arc::new(NullResolver)),
        )
    }

    #[tokio::test]
    async fn listing_is_scoped_filtered_and_newest_first() {
        let store = InMemoryNotificationStore::new();
        let tenant_id = TenantId::new();
        let viewer = UserId::new();
        let scope = NotificationScope::new(tenant_id, viewer);
        let now = Utc::now();

        let mut welcome =
            NotificationDraft::welcome(tenant_id, viewer, "Viewer").into_notification(now);
        welcome.created_at = now - TimeDelta::minutes(10);
        assert!(store.insert(welcome).await.is_ok());

        let broadcast = NotificationDraft::system_alert(tenant_id, "Maintenance", "Tonight")
            .into_notification(now);
        assert!(store.insert(broadcast).await.is_ok());

        let other_recipient =
            NotificationDraft::welcome(tenant_id, UserId::new(), "Other").into_notification(now);
        assert!(store.insert(other_recipient).await.is_ok());

        let other_tenant = NotificationDraft::system_alert(TenantId::new(), "Foreign", "Row")
            .into_notification(now);
        assert!(store.insert(other_tenant).await.is_ok());

        let mut expired =
            NotificationDraft::system_alert(tenant_id, "Old", "Gone").into_notification(now);
        expired.expires_at = Some(now - TimeDelta::seconds(1));
        assert!(store.insert(expired).await.is_ok());

        let listed = store
            .list_visible(&scope, &NotificationQuery::default(), now)
            .await
            .unwrap_or_default();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "Maintenance");
        assert_eq!(listed[1].title, "Welcome");

        let by_category = store
            .list_visible(
                &scope,
                &NotificationQuery {
                    category: Some(NotificationCategory::System),
                    ..NotificationQuery::default()
                },
                now,
            )
            .await
            .unwrap_or_default();
        assert_eq!(by_category.len(), 1);
    }

    #[tokio::test]
    async fn expired_rows_stay_hidden_even_with_archived_included() {
        let store = InMemoryNotificationStore::new();
        let tenant_id = TenantId::new();
        let scope = NotificationScope::new(tenant_id, UserId::new());
        let now = Utc::now();

        let mut expired =
            NotificationDraft::system_alert(tenant_id, "Old", "Gone").into_notification(now);
        expired.expires_at = Some(now - TimeDelta::seconds(5));
        expired.is_archived = true;
        assert!(store.insert(expired.clone()).await.is_ok());

        let listed = store
            .list_visible(
                &scope,
                &NotificationQuery {
                    include_archived: true,
                    ..NotificationQuery::default()
                },
                now,
            )
            .await
            .unwrap_or_default();
        assert!(listed.is_empty());

        // The row was filtered, not purged.
        let found = store.find(tenant_id, expired.id).await;
        assert!(found.unwrap_or(None).is_some());
    }

    #[tokio::test]
    async fn limit_caps_the_listing() {
        let store = InMemoryNotificationStore::new();
        let tenant_id = TenantId::new();
        let scope = NotificationScope::new(tenant_id, UserId::new());
        let now = Utc::now();

        for index in 0..5 {
            let mut row = NotificationDraft::system_alert(tenant_id, "Batch", "Row")
                .into_notification(now);
            row.created_at = now - TimeDelta::seconds(index);
            assert!(store.insert(row).await.is_ok());
        }

        let listed = store
            .list_visible(
                &scope,
                &NotificationQuery {
                    limit: 3,
                    ..NotificationQuery::default()
                },
                now,
            )
            .await
            .unwrap_or_default();
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn broadcast_reaches_tenant_subscribers_through_the_feed() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let service = service_over(store.clone());

        let clinic_one = TenantId::new();
        let clinic_two = TenantId::new();
        let first_viewer = UserId::new();
        let second_viewer = UserId::new();
        let outsider = UserId::new();

        let feed = Box::new(store.change_feed());
        let driver = {
            let service = service.clone();
            tokio::spawn(async move { service.run_change_feed(feed).await })
        };

        let mut first = service
            .subscribe(NotificationScope::new(clinic_one, first_viewer))
            .await
            .unwrap_or_else(|_| unreachable!());
        let mut second = service
            .subscribe(NotificationScope::new(clinic_one, second_viewer))
            .await
            .unwrap_or_else(|_| unreachable!());
        let mut third = service
            .subscribe(NotificationScope::new(clinic_two, outsider))
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(first.next_snapshot().await.is_some());
        assert!(second.next_snapshot().await.is_some());
        assert!(third.next_snapshot().await.is_some());

        let created = service
            .create(NotificationDraft::system_alert(
                clinic_one,
                "Water outage",
                "Mains work until noon",
            ))
            .await
            .unwrap_or_else(|_| unreachable!());

        let first_snapshot = tokio::time::timeout(Duration::from_secs(2), first.next_snapshot())
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        assert!(first_snapshot.iter().any(|row| row.id == created.id));

        let second_snapshot = tokio::time::timeout(Duration::from_secs(2), second.next_snapshot())
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        assert!(second_snapshot.iter().any(|row| row.id == created.id));

        let third_snapshot =
            tokio::time::timeout(Duration::from_millis(100), third.next_snapshot()).await;
        assert!(third_snapshot.is_err());

        let first_unread = service
            .unread_count(&NotificationScope::new(clinic_one, first_viewer))
            .await;
        assert_eq!(first_unread.unwrap_or(0), 1);
        let outsider_unread = service
            .unread_count(&NotificationScope::new(clinic_two, outsider))
            .await;
        assert_eq!(outsider_unread.unwrap_or(9), 0);

        driver.abort();
    }
}
