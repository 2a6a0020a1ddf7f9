//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_service;
mod authorization_service;
mod notification_service;
mod session_service;

pub use audit_service::{AuditService, AuditStore, ClientContext, ClientContextResolver};
pub use authorization_service::AuthorizationService;
pub use notification_service::{
    AlertSurface, ChangeFeedEvent, ChangeFeedEventKind, ChannelSender, NotificationChangeFeed,
    NotificationQuery, NotificationService, NotificationStore, NotificationSubscription,
    RecipientDirectory,
};
pub use session_service::{
    HeartbeatTransport, SessionLifecycleManager, SessionObserver, SharedActivityStore,
};
