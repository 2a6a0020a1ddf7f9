//! Domain entities and invariants for the practice-management core.

#![forbid(unsafe_code)]

mod access;
mod audit;
mod context;
mod notification;
mod routes;
mod session;

pub use access::{
    Permission, ResourceAction, Role, SensitiveFeature, WILDCARD_RESOURCE, can_manage,
    feature_roles, has_permission, has_permission_tags, has_sensitive_access, resources,
    role_permissions,
};
pub use audit::{AuditAction, AuditRecord, AuditRecordDraft, RiskLevel};
pub use context::UserContext;
pub use notification::{
    Notification, NotificationAction, NotificationActionKind, NotificationActionStyle,
    NotificationCategory, NotificationChannel, NotificationDraft, NotificationId,
    NotificationPriority, NotificationScope,
};
pub use routes::{RouteGuard, RouteSpec, accessible_routes, route_registry};
pub use session::{
    SessionEffect, SessionEvent, SessionPhase, SessionPolicy, SessionState, step,
};
