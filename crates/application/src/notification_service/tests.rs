use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use clinicore_core::{AppError, AppResult, TenantId, UserId};
use clinicore_domain::{
    AuditAction, AuditRecord, Notification, NotificationChannel, NotificationDraft,
    NotificationId, NotificationScope,
};
use tokio::sync::Mutex;

use crate::{AuditService, AuditStore, ClientContext, ClientContextResolver};

use super::ports::{
    AlertSurface, ChangeFeedEvent, ChangeFeedEventKind, ChannelSender, NotificationQuery,
    NotificationStore,
};
use super::service::NotificationService;

#[derive(Default)]
struct FakeNotificationStore {
    rows: Mutex<Vec<Notification>>,
    fail_inserts: bool,
}

#[async_trait]
impl NotificationStore for FakeNotificationStore {
    async fn insert(&self, notification: Notification) -> AppResult<()> {
        if self.fail_inserts {
            return Err(AppError::Internal("store unavailable".to_owned()));
        }
        self.rows.lock().await.push(notification);
        Ok(())
    }

    async fn find(
        &self,
        tenant_id: TenantId,
        id: NotificationId,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.tenant_id == tenant_id && row.id == id)
            .cloned())
    }

    async fn list_visible(
        &self,
        scope: &NotificationScope,
        query: &NotificationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Notification>> {
        let rows = self.rows.lock().await;
        let mut listed: Vec<Notification> = rows
            .iter()
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
        let mut rows = self.rows.lock().await;
        let mut changed = 0;
        for row in rows.iter_mut() {
            if row.tenant_id == tenant_id && ids.contains(&row.id) && !row.is_read {
                row.is_read = true;
                row.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn mark_archived(
        &self,
        tenant_id: TenantId,
        ids: &[NotificationId],
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let mut changed = 0;
        for row in rows.iter_mut() {
            if row.tenant_id == tenant_id && ids.contains(&row.id) && !row.is_archived {
                row.is_archived = true;
                row.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, tenant_id: TenantId, id: NotificationId) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| !(row.tenant_id == tenant_id && row.id == id));
        if rows.len() == before {
            return Err(AppError::NotFound(format!("notification '{id}'")));
        }
        Ok(())
    }

    async fn count_unread(
        &self,
        scope: &NotificationScope,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| {
                scope.matches(row) && !row.is_expired(now) && !row.is_read && !row.is_archived
            })
            .count() as u64)
    }
}

struct CountingSender {
    channel: NotificationChannel,
    deliveries: AtomicUsize,
    fail: bool,
}

impl CountingSender {
    fn new(channel: NotificationChannel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            deliveries: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing(channel: NotificationChannel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            deliveries: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl ChannelSender for CountingSender {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn deliver(&self, _notification: &Notification) -> AppResult<()> {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Internal("gateway rejected message".to_owned()));
        }
        Ok(())
    }
}

struct FakeAlertSurface {
    grant: bool,
    permission_requests: AtomicUsize,
    presented: AtomicUsize,
}

impl FakeAlertSurface {
    fn granting() -> Arc<Self> {
        Arc::new(Self {
            grant: true,
            permission_requests: AtomicUsize::new(0),
            presented: AtomicUsize::new(0),
        })
    }

    fn denying() -> Arc<Self> {
        Arc::new(Self {
            grant: false,
            permission_requests: AtomicUsize::new(0),
            presented: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AlertSurface for FakeAlertSurface {
    async fn request_permission(&self) -> AppResult<bool> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.grant)
    }

    async fn present(&self, _notification: &Notification) -> AppResult<()> {
        self.presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

#[async_trait]
impl AuditStore for FakeAuditStore {
    async fn append(&self, record: AuditRecord) -> AppResult<()> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

struct FakeResolver;

#[async_trait]
impl ClientContextResolver for FakeResolver {
    async fn resolve(&self) -> AppResult<ClientContext> {
        Ok(ClientContext::unknown())
    }
}

struct Harness {
    service: NotificationService,
    store: Arc<FakeNotificationStore>,
    email: Arc<CountingSender>,
    sms: Arc<CountingSender>,
    alerts: Arc<FakeAlertSurface>,
    audit_store: Arc<FakeAuditStore>,
}

fn harness_with(email: Arc<CountingSender>, alerts: Arc<FakeAlertSurface>) -> Harness {
    let store = Arc::new(FakeNotificationStore::default());
    let sms = CountingSender::new(NotificationChannel::Sms);
    let audit_store = Arc::new(FakeAuditStore::default());
    let audit = AuditService::new(audit_store.clone(), Arc::new(FakeResolver));
    let senders: Vec<Arc<dyn ChannelSender>> = vec![email.clone(), sms.clone()];
    let service = NotificationService::new(store.clone(), senders, alerts.clone(), audit);
    Harness {
        service,
        store,
        email,
        sms,
        alerts,
        audit_store,
    }
}

fn harness() -> Harness {
    harness_with(
        CountingSender::new(NotificationChannel::Email),
        FakeAlertSurface::granting(),
    )
}

#[tokio::test]
async fn create_dispatches_each_outbound_channel() {
    let harness = harness();
    let draft = NotificationDraft::appointment_reminder(
        TenantId::new(),
        UserId::new(),
        "A. Mensah",
        Utc::now() + TimeDelta::hours(4),
    );

    let created = harness.service.create(draft).await;
    assert!(created.is_ok());
    assert_eq!(harness.email.deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(harness.sms.deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(harness.store.rows.lock().await.len(), 1);
}

#[tokio::test]
async fn one_channel_failure_does_not_block_the_others() {
    let harness = harness_with(
        CountingSender::failing(NotificationChannel::Email),
        FakeAlertSurface::granting(),
    );
    let draft = NotificationDraft::appointment_reminder(
        TenantId::new(),
        UserId::new(),
        "A. Mensah",
        Utc::now() + TimeDelta::hours(4),
    );

    let created = harness.service.create(draft).await;
    assert!(created.is_ok());
    assert_eq!(harness.email.deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(harness.sms.deliveries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scheduled_notifications_defer_dispatch() {
    let harness = harness();
    let mut draft = NotificationDraft::payment_due(
        TenantId::new(),
        UserId::new(),
        "INV-2041",
        Utc::now() + TimeDelta::days(14),
    );
    draft.scheduled_for = Some(Utc::now() + TimeDelta::days(7));

    let created = harness.service.create(draft).await;
    assert!(created.is_ok());
    assert_eq!(harness.email.deliveries.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.rows.lock().await.len(), 1);
}

#[tokio::test]
async fn invalid_drafts_are_rejected_before_persistence() {
    let harness = harness();
    let mut draft = NotificationDraft::welcome(TenantId::new(), UserId::new(), "Dr. Osei");
    draft.message = String::new();

    assert!(harness.service.create(draft).await.is_err());
    assert!(harness.store.rows.lock().await.is_empty());
}

#[tokio::test]
async fn store_failures_propagate_to_the_caller() {
    let store = Arc::new(FakeNotificationStore {
        rows: Mutex::new(Vec::new()),
        fail_inserts: true,
    });
    let audit = AuditService::new(Arc::new(FakeAuditStore::default()), Arc::new(FakeResolver));
    let service = NotificationService::new(
        store,
        Vec::new(),
        FakeAlertSurface::granting(),
        audit,
    );

    let draft = NotificationDraft::welcome(TenantId::new(), UserId::new(), "Dr. Osei");
    assert!(service.create(draft).await.is_err());
}

#[tokio::test]
async fn mark_read_drops_foreign_ids_and_audits_the_batch_once() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let viewer = UserId::new();
    let other = UserId::new();
    let scope = NotificationScope::new(tenant_id, viewer);

    let own = harness
        .service
        .create(NotificationDraft::welcome(tenant_id, viewer, "Viewer"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let broadcast = harness
        .service
        .create(NotificationDraft::system_alert(
            tenant_id,
            "Maintenance",
            "Tonight",
        ))
        .await
        .unwrap_or_else(|_| unreachable!());
    let foreign = harness
        .service
        .create(NotificationDraft::welcome(tenant_id, other, "Other"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let changed = harness
        .service
        .mark_read(&scope, &[own.id, broadcast.id, foreign.id])
        .await;
    assert_eq!(changed.unwrap_or(0), 2);

    let rows = harness.store.rows.lock().await;
    let foreign_row = rows
        .iter()
        .find(|row| row.id == foreign.id)
        .unwrap_or_else(|| unreachable!());
    assert!(!foreign_row.is_read);
    drop(rows);

    let audit_records = harness.audit_store.records.lock().await;
    assert_eq!(audit_records.len(), 1);
    assert_eq!(audit_records[0].action, AuditAction::NotificationsRead);
    assert_eq!(
        audit_records[0]
            .details
            .as_ref()
            .and_then(|details| details.get("count"))
            .and_then(serde_json::Value::as_u64),
        Some(2)
    );
}

#[tokio::test]
async fn repeated_mark_read_is_idempotent_and_audits_per_call() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let viewer = UserId::new();
    let scope = NotificationScope::new(tenant_id, viewer);

    let own = harness
        .service
        .create(NotificationDraft::welcome(tenant_id, viewer, "Viewer"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let first = harness.service.mark_read(&scope, &[own.id]).await;
    assert_eq!(first.unwrap_or(0), 1);
    let second = harness.service.mark_read(&scope, &[own.id]).await;
    assert_eq!(second.unwrap_or(9), 0);

    assert_eq!(harness.service.unread_count(&scope).await.unwrap_or(9), 0);
    assert_eq!(harness.audit_store.records.lock().await.len(), 2);
}

#[tokio::test]
async fn delete_outside_the_scope_is_not_found() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let scope = NotificationScope::new(tenant_id, UserId::new());

    let foreign = harness
        .service
        .create(NotificationDraft::welcome(tenant_id, UserId::new(), "Other"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let deleted = harness.service.delete(&scope, foreign.id).await;
    assert!(matches!(deleted, Err(AppError::NotFound(_))));
    assert_eq!(harness.store.rows.lock().await.len(), 1);
}

#[tokio::test]
async fn archive_hides_rows_from_default_listing() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let viewer = UserId::new();
    let scope = NotificationScope::new(tenant_id, viewer);

    let own = harness
        .service
        .create(NotificationDraft::welcome(tenant_id, viewer, "Viewer"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let archived = harness.service.mark_archived(&scope, &[own.id]).await;
    assert_eq!(archived.unwrap_or(0), 1);

    let visible = harness
        .service
        .list(&scope, &NotificationQuery::default())
        .await;
    assert!(visible.unwrap_or_default().is_empty());

    let with_archived = harness
        .service
        .list(
            &scope,
            &NotificationQuery {
                include_archived: true,
                ..NotificationQuery::default()
            },
        )
        .await;
    assert_eq!(with_archived.unwrap_or_default().len(), 1);
}

#[tokio::test]
async fn subscribe_pushes_the_current_visible_list_immediately() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let viewer = UserId::new();
    let scope = NotificationScope::new(tenant_id, viewer);

    let created = harness
        .service
        .create(NotificationDraft::welcome(tenant_id, viewer, "Viewer"))
        .await;
    assert!(created.is_ok());
    let foreign = harness
        .service
        .create(NotificationDraft::system_alert(
            TenantId::new(),
            "Elsewhere",
            "Other tenant",
        ))
        .await;
    assert!(foreign.is_ok());

    let mut subscription = harness
        .service
        .subscribe(scope)
        .await
        .unwrap_or_else(|_| unreachable!());
    let snapshot = subscription.next_snapshot().await.unwrap_or_default();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].tenant_id, tenant_id);
}

#[tokio::test]
async fn change_events_fan_out_by_tenant_and_recipient() {
    let harness = harness();
    let clinic_one = TenantId::new();
    let clinic_two = TenantId::new();
    let first_viewer = UserId::new();
    let second_viewer = UserId::new();
    let outsider = UserId::new();

    let mut first = harness
        .service
        .subscribe(NotificationScope::new(clinic_one, first_viewer))
        .await
        .unwrap_or_else(|_| unreachable!());
    let mut second = harness
        .service
        .subscribe(NotificationScope::new(clinic_one, second_viewer))
        .await
        .unwrap_or_else(|_| unreachable!());
    let mut third = harness
        .service
        .subscribe(NotificationScope::new(clinic_two, outsider))
        .await
        .unwrap_or_else(|_| unreachable!());

    // Drain the initial snapshots.
    assert!(first.next_snapshot().await.is_some());
    assert!(second.next_snapshot().await.is_some());
    assert!(third.next_snapshot().await.is_some());

    let broadcast = harness
        .service
        .create(NotificationDraft::system_alert(
            clinic_one,
            "Power maintenance",
            "Generator test at 22:00",
        ))
        .await
        .unwrap_or_else(|_| unreachable!());
    harness
        .service
        .apply_change_event(&ChangeFeedEvent {
            kind: ChangeFeedEventKind::Insert,
            notification: broadcast.clone(),
        })
        .await;

    let first_snapshot = first.next_snapshot().await.unwrap_or_default();
    assert!(first_snapshot.iter().any(|row| row.id == broadcast.id));
    let second_snapshot = second.next_snapshot().await.unwrap_or_default();
    assert!(second_snapshot.iter().any(|row| row.id == broadcast.id));

    let third_snapshot =
        tokio::time::timeout(Duration::from_millis(50), third.next_snapshot()).await;
    assert!(third_snapshot.is_err());

    let first_unread = harness
        .service
        .unread_count(&NotificationScope::new(clinic_one, first_viewer))
        .await;
    assert_eq!(first_unread.unwrap_or(0), 1);
    let second_unread = harness
        .service
        .unread_count(&NotificationScope::new(clinic_one, second_viewer))
        .await;
    assert_eq!(second_unread.unwrap_or(0), 1);
    let outsider_unread = harness
        .service
        .unread_count(&NotificationScope::new(clinic_two, outsider))
        .await;
    assert_eq!(outsider_unread.unwrap_or(9), 0);
}

#[tokio::test]
async fn urgent_inserts_request_alert_permission_once() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let viewer = UserId::new();

    let mut subscription = harness
        .service
        .subscribe(NotificationScope::new(tenant_id, viewer))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(subscription.next_snapshot().await.is_some());

    for title in ["First", "Second"] {
        let urgent = harness
            .service
            .create(NotificationDraft::system_alert(tenant_id, title, "Now"))
            .await
            .unwrap_or_else(|_| unreachable!());
        harness
            .service
            .apply_change_event(&ChangeFeedEvent {
                kind: ChangeFeedEventKind::Insert,
                notification: urgent,
            })
            .await;
    }

    assert_eq!(harness.alerts.permission_requests.load(Ordering::SeqCst), 1);
    assert_eq!(harness.alerts.presented.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn alert_denial_is_a_silent_no_op() {
    let harness = harness_with(
        CountingSender::new(NotificationChannel::Email),
        FakeAlertSurface::denying(),
    );
    let tenant_id = TenantId::new();
    let viewer = UserId::new();

    let mut subscription = harness
        .service
        .subscribe(NotificationScope::new(tenant_id, viewer))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(subscription.next_snapshot().await.is_some());

    let urgent = harness
        .service
        .create(NotificationDraft::system_alert(tenant_id, "Alert", "Now"))
        .await
        .unwrap_or_else(|_| unreachable!());
    harness
        .service
        .apply_change_event(&ChangeFeedEvent {
            kind: ChangeFeedEventKind::Insert,
            notification: urgent,
        })
        .await;

    assert_eq!(harness.alerts.permission_requests.load(Ordering::SeqCst), 1);
    assert_eq!(harness.alerts.presented.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_stops_snapshots() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let viewer = UserId::new();

    let mut subscription = harness
        .service
        .subscribe(NotificationScope::new(tenant_id, viewer))
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(subscription.next_snapshot().await.is_some());

    harness.service.unsubscribe(subscription.id()).await;
    harness.service.unsubscribe(subscription.id()).await;

    let broadcast = harness
        .service
        .create(NotificationDraft::system_alert(tenant_id, "After", "Teardown"))
        .await
        .unwrap_or_else(|_| unreachable!());
    harness
        .service
        .apply_change_event(&ChangeFeedEvent {
            kind: ChangeFeedEventKind::Insert,
            notification: broadcast,
        })
        .await;

    let next = tokio::time::timeout(Duration::from_millis(50), subscription.next_snapshot()).await;
    assert!(matches!(next, Ok(None) | Err(_)));
}
