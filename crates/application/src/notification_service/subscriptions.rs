use clinicore_domain::{Notification, NotificationScope};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Live subscription delivering visible-list snapshots for one viewer.
///
/// The first snapshot arrives immediately after subscribing; later ones
/// follow every relevant change-feed event. Dropping the handle detaches it
/// lazily; `NotificationService::unsubscribe` is the explicit teardown.
pub struct NotificationSubscription {
    id: Uuid,
    scope: NotificationScope,
    receiver: mpsc::UnboundedReceiver<Vec<Notification>>,
}

impl NotificationSubscription {
    pub(super) fn new(
        id: Uuid,
        scope: NotificationScope,
        receiver: mpsc::UnboundedReceiver<Vec<Notification>>,
    ) -> Self {
        Self {
            id,
            scope,
            receiver,
        }
    }

    /// Stable identifier used with `NotificationService::unsubscribe`.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The tenant and recipient this subscription is scoped to.
    #[must_use]
    pub fn scope(&self) -> &NotificationScope {
        &self.scope
    }

    /// Waits for the next snapshot; `None` once detached.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Notification>> {
        self.receiver.recv().await
    }
}

/// Registry entry fanning snapshots out to one subscription.
pub(super) struct SubscriberEntry {
    pub(super) id: Uuid,
    pub(super) scope: NotificationScope,
    pub(super) sender: mpsc::UnboundedSender<Vec<Notification>>,
}
