//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_channel_sender;
mod http_heartbeat_transport;
mod http_push_sender;
mod http_sms_sender;
mod in_memory_notification_store;
mod in_memory_shared_activity_store;
mod postgres_audit_store;
mod postgres_notification_change_feed;
mod postgres_notification_store;
mod redis_shared_activity_store;
mod smtp_email_sender;
mod static_client_context_resolver;
mod tracing_alert_surface;

pub use console_channel_sender::ConsoleChannelSender;
pub use http_heartbeat_transport::HttpHeartbeatTransport;
pub use http_push_sender::HttpPushSender;
pub use http_sms_sender::HttpSmsSender;
pub use in_memory_notification_store::{InMemoryChangeFeed, InMemoryNotificationStore};
pub use in_memory_shared_activity_store::InMemorySharedActivityStore;
pub use postgres_audit_store::PostgresAuditStore;
pub use postgres_notification_change_feed::PostgresNotificationChangeFeed;
pub use postgres_notification_store::PostgresNotificationStore;
pub use redis_shared_activity_store::RedisSharedActivityStore;
pub use smtp_email_sender::{SmtpEmailSender, SmtpSenderConfig};
pub use static_client_context_resolver::StaticClientContextResolver;
pub use tracing_alert_surface::TracingAlertSurface;
