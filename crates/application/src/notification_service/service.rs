use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use clinicore_core::{AppError, AppResult, UserId};
use clinicore_domain::{
    AuditAction, AuditRecordDraft, Notification, NotificationChannel, NotificationDraft,
    NotificationId, NotificationScope, RiskLevel, resources,
};
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::AuditService;

use super::ports::{
    AlertSurface, ChangeFeedEvent, ChangeFeedEventKind, ChannelSender, NotificationChangeFeed,
    NotificationQuery, NotificationStore,
};
use super::subscriptions::{NotificationSubscription, SubscriberEntry};

/// Multi-channel notification manager: creation and dispatch, tenant-scoped
/// querying, read/archive/delete transitions, and real-time fan-out to
/// subscribed viewers.
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<NotificationInner>,
}

struct NotificationInner {
    store: Arc<dyn NotificationStore>,
    senders: Vec<Arc<dyn ChannelSender>>,
    alerts: Arc<dyn AlertSurface>,
    audit: AuditService,
    /// One entry list per recipient; a single change-feed event fans out to
    /// every entry of the affected recipients.
    subscribers: RwLock<HashMap<UserId, Vec<SubscriberEntry>>>,
    /// Alert permission, requested at most once. `None` until first needed.
    alert_permission: Mutex<Option<bool>>,
}

impl NotificationService {
    /// Creates a service over a store, per-channel senders, an alert
    /// surface, and the audit trail.
    #[must_use]
    pub fn new(
        store: Arc<dyn NotificationStore>,
        senders: Vec<Arc<dyn ChannelSender>>,
        alerts: Arc<dyn AlertSurface>,
        audit: AuditService,
    ) -> Self {
        Self {
            inner: Arc::new(NotificationInner {
                store,
                senders,
                alerts,
                audit,
                subscribers: RwLock::new(HashMap::new()),
                alert_permission: Mutex::new(None),
            }),
        }
    }

    /// Persists a notification and, unless dispatch is scheduled for later,
    /// delivers it to every listed outbound channel.
    ///
    /// The call succeeds once the row is persisted; each channel failure is
    /// caught and logged independently. In-app delivery happens through the
    /// read model and the change feed, not a send step.
    pub async fn create(&self, draft: NotificationDraft) -> AppResult<Notification> {
        draft.validate()?;

        let now = Utc::now();
        let notification = draft.into_notification(now);
        self.inner.store.insert(notification.clone()).await?;

        if notification.is_due(now) {
            self.dispatch(&notification).await;
        } else {
            debug!(id = %notification.id, "dispatch deferred until scheduled time");
        }

        Ok(notification)
    }

    async fn dispatch(&self, notification: &Notification) {
        for channel in &notification.channels {
            if *channel == NotificationChannel::InApp {
                continue;
            }

            let Some(sender) = self
                .inner
                .senders
                .iter()
                .find(|sender| sender.channel() == *channel)
            else {
                warn!(
                    channel = channel.as_str(),
                    "no sender registered for channel"
                );
                continue;
            };

            if let Err(error) = sender.deliver(notification).await {
                warn!(
                    channel = channel.as_str(),
                    id = %notification.id,
                    %error,
                    "channel delivery failed"
                );
            }
        }
    }

    /// Lists notifications visible to the scope: recipient-specific or
    /// tenant-broadcast, never expired, archived only on request.
    pub async fn list(
        &self,
        scope: &NotificationScope,
        query: &NotificationQuery,
    ) -> AppResult<Vec<Notification>> {
        self.inner.store.list_visible(scope, query, Utc::now()).await
    }

    /// Marks notifications read for the scope and audits the batch once.
    ///
    /// Ids outside the scope are dropped at this boundary, whatever the
    /// store itself would allow. Returns the number of rows changed.
    pub async fn mark_read(
        &self,
        scope: &NotificationScope,
        ids: &[NotificationId],
    ) -> AppResult<u64> {
        let permitted = self.permitted_ids(scope, ids).await?;
        let changed = if permitted.is_empty() {
            0
        } else {
            self.inner
                .store
                .mark_read(scope.tenant_id, &permitted, Utc::now())
                .await?
        };

        self.inner
            .audit
            .record(AuditRecordDraft {
                actor_id: scope.recipient_id,
                tenant_id: scope.tenant_id,
                action: AuditAction::NotificationsRead,
                resource: resources::NOTIFICATION.to_owned(),
                resource_id: None,
                details: Some(serde_json::json!({ "count": permitted.len() })),
                risk_level: RiskLevel::Low,
            })
            .await;

        Ok(changed)
    }

    /// Archives notifications for the scope. Returns the number changed.
    pub async fn mark_archived(
        &self,
        scope: &NotificationScope,
        ids: &[NotificationId],
    ) -> AppResult<u64> {
        let permitted = self.permitted_ids(scope, ids).await?;
        if permitted.is_empty() {
            return Ok(0);
        }

        self.inner
            .store
            .mark_archived(scope.tenant_id, &permitted, Utc::now())
            .await
    }

    /// Deletes one notification the scope may see.
    pub async fn delete(&self, scope: &NotificationScope, id: NotificationId) -> AppResult<()> {
        let permitted = self.permitted_ids(scope, &[id]).await?;
        if permitted.is_empty() {
            return Err(AppError::NotFound(format!(
                "notification '{id}' is not visible to this recipient"
            )));
        }

        self.inner.store.delete(scope.tenant_id, id).await
    }

    /// Counts unread notifications under the same filters as an unread-only
    /// list.
    pub async fn unread_count(&self, scope: &NotificationScope) -> AppResult<u64> {
        self.inner.store.count_unread(scope, Utc::now()).await
    }

    /// Resolves the subset of `ids` the scope may mutate: rows in the same
    /// tenant that are broadcast or addressed to the recipient.
    async fn permitted_ids(
        &self,
        scope: &NotificationScope,
        ids: &[NotificationId],
    ) -> AppResult<Vec<NotificationId>> {
        let mut permitted = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(notification) = self.inner.store.find(scope.tenant_id, *id).await?
                && scope.matches(&notification)
            {
                permitted.push(*id);
            }
        }

        Ok(permitted)
    }

    /// Registers a subscriber and immediately pushes the current visible
    /// list.
    pub async fn subscribe(
        &self,
        scope: NotificationScope,
    ) -> AppResult<NotificationSubscription> {
        let snapshot = self.list(&scope, &NotificationQuery::default()).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        if sender.send(snapshot).is_err() {
            warn!(subscription = %id, "subscriber channel closed before first snapshot");
        }

        self.inner
            .subscribers
            .write()
            .await
            .entry(scope.recipient_id)
            .or_default()
            .push(SubscriberEntry {
                id,
                scope,
                sender,
            });

        debug!(subscription = %id, recipient = %scope.recipient_id, "subscriber registered");
        Ok(NotificationSubscription::new(id, scope, receiver))
    }

    /// Removes a subscription. Unknown or already-removed ids are a no-op.
    pub async fn unsubscribe(&self, id: Uuid) {
        let mut subscribers = self.inner.subscribers.write().await;
        for entries in subscribers.values_mut() {
            entries.retain(|entry| entry.id != id);
        }
        subscribers.retain(|_, entries| !entries.is_empty());
    }

    /// Applies one change-feed event: re-filters by tenant and recipient
    /// (the feed is not assumed pre-scoped) and re-pushes the visible list
    /// to every subscriber the row is addressed to.
    pub async fn apply_change_event(&self, event: &ChangeFeedEvent) {
        let targets: Vec<(Uuid, NotificationScope, mpsc::UnboundedSender<Vec<Notification>>)> = {
            let subscribers = self.inner.subscribers.read().await;
            subscribers
                .values()
                .flatten()
                .filter(|entry| entry.scope.matches(&event.notification))
                .map(|entry| (entry.id, entry.scope, entry.sender.clone()))
                .collect()
        };
        if targets.is_empty() {
            return;
        }

        let mut stale = Vec::new();
        for (id, scope, sender) in targets {
            let snapshot = match self.list(&scope, &NotificationQuery::default()).await {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    warn!(subscription = %id, %error, "subscriber snapshot query failed");
                    continue;
                }
            };
            if sender.send(snapshot).is_err() {
                stale.push(id);
            }
        }
        for id in stale {
            self.unsubscribe(id).await;
        }

        if event.kind == ChangeFeedEventKind::Insert && event.notification.priority.is_alerting() {
            self.present_alert(&event.notification).await;
        }
    }

    /// Drives the fan-out loop from a change feed until it ends or fails.
    pub async fn run_change_feed(&self, mut feed: Box<dyn NotificationChangeFeed>) {
        loop {
            match feed.next_event().await {
                Ok(Some(event)) => self.apply_change_event(&event).await,
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "change feed failed");
                    break;
                }
            }
        }
        debug!("change feed ended");
    }

    async fn present_alert(&self, notification: &Notification) {
        let granted = {
            let mut permission = self.inner.alert_permission.lock().await;
            if permission.is_none() {
                *permission = Some(match self.inner.alerts.request_permission().await {
                    Ok(granted) => granted,
                    Err(error) => {
                        debug!(%error, "alert permission request failed");
                        false
                    }
                });
            }
            *permission == Some(true)
        };
        if !granted {
            return;
        }

        if let Err(error) = self.inner.alerts.present(notification).await {
            debug!(id = %notification.id, %error, "alert presentation failed");
        }
    }
}
