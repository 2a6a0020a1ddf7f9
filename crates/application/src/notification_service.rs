//! Notification management: ports, the service, and subscription handles.

mod ports;
mod service;
mod subscriptions;

#[cfg(test)]
mod tests;

pub use ports::{
    AlertSurface, ChangeFeedEvent, ChangeFeedEventKind, ChannelSender, NotificationChangeFeed,
    NotificationQuery, NotificationStore, RecipientDirectory,
};
pub use service::NotificationService;
pub use subscriptions::NotificationSubscription;
