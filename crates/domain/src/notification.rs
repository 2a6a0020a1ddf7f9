//! Notification records, scoping, and template builders.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clinicore_core::{AppError, AppResult, TenantId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a notification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random notification identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a notification identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for NotificationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Delivery urgency. `High` and `Urgent` additionally trigger the
/// interactive alert surface for subscribed viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Informational.
    Low,
    /// Default priority.
    Medium,
    /// Needs prompt attention.
    High,
    /// Needs immediate attention.
    Urgent,
}

impl NotificationPriority {
    /// Returns a stable storage value for this priority.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Whether this priority triggers the interactive alert surface.
    #[must_use]
    pub fn is_alerting(&self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}

impl FromStr for NotificationPriority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(AppError::Validation(format!(
                "unknown notification priority '{value}'"
            ))),
        }
    }
}

/// Topical grouping used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Scheduling and appointments.
    Appointment,
    /// Invoices and payments.
    Billing,
    /// Stock and supplies.
    Inventory,
    /// Staff and rostering.
    Staff,
    /// Platform and tenant announcements.
    System,
}

impl NotificationCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
            Self::Billing => "billing",
            Self::Inventory => "inventory",
            Self::Staff => "staff",
            Self::System => "system",
        }
    }
}

impl FromStr for NotificationCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "appointment" => Ok(Self::Appointment),
            "billing" => Ok(Self::Billing),
            "inventory" => Ok(Self::Inventory),
            "staff" => Ok(Self::Staff),
            "system" => Ok(Self::System),
            _ => Err(AppError::Validation(format!(
                "unknown notification category '{value}'"
            ))),
        }
    }
}

/// Delivery channel. In-app delivery happens through the read model; the
/// other channels go through per-channel senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// Read-model delivery to subscribed viewers.
    InApp,
    /// Outbound email.
    Email,
    /// Outbound SMS.
    Sms,
    /// Outbound push.
    Push,
}

impl NotificationChannel {
    /// Returns a stable storage value for this channel.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InApp => "in_app",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }
}

impl FromStr for NotificationChannel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in_app" => Ok(Self::InApp),
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "push" => Ok(Self::Push),
            _ => Err(AppError::Validation(format!(
                "unknown notification channel '{value}'"
            ))),
        }
    }
}

/// What pressing a notification action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationActionKind {
    /// Navigate to a route.
    Navigate,
    /// Call an application endpoint.
    InvokeEndpoint,
    /// Dismiss the notification.
    Dismiss,
}

/// Visual weight of a notification action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationActionStyle {
    /// Emphasized action.
    Primary,
    /// Plain action.
    Secondary,
    /// Destructive action.
    Destructive,
}

/// One button attached to a notification. Immutable once attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Stable action identifier within the notification.
    pub id: String,
    /// Button label.
    pub label: String,
    /// What pressing the button does.
    pub kind: NotificationActionKind,
    /// Route or endpoint, depending on the kind.
    pub target: Option<String>,
    /// Visual weight.
    pub style: NotificationActionStyle,
}

impl NotificationAction {
    fn navigate(id: &str, label: &str, target: &str) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
            kind: NotificationActionKind::Navigate,
            target: Some(target.to_owned()),
            style: NotificationActionStyle::Primary,
        }
    }

    fn invoke(id: &str, label: &str, target: &str) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
            kind: NotificationActionKind::InvokeEndpoint,
            target: Some(target.to_owned()),
            style: NotificationActionStyle::Secondary,
        }
    }

    fn dismiss() -> Self {
        Self {
            id: "dismiss".to_owned(),
            label: "Dismiss".to_owned(),
            kind: NotificationActionKind::Dismiss,
            target: None,
            style: NotificationActionStyle::Secondary,
        }
    }
}

/// One notification row. Mutated only through the read/archive/delete
/// transitions; expired rows are filtered from reads, not purged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Stable row identifier.
    pub id: NotificationId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Addressee; `None` broadcasts to the whole tenant.
    pub recipient_id: Option<UserId>,
    /// Template or event tag that produced the notification.
    pub kind: String,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Opaque structured payload.
    pub data: Option<serde_json::Value>,
    /// Delivery urgency.
    pub priority: NotificationPriority,
    /// Topical grouping.
    pub category: NotificationCategory,
    /// Channels to deliver on.
    pub channels: Vec<NotificationChannel>,
    /// Read flag.
    pub is_read: bool,
    /// Archived flag.
    pub is_archived: bool,
    /// Hidden from reads at and after this instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Dispatch is deferred until this instant.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Attached action buttons.
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Whether the row is hidden from reads at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether dispatch is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.is_none_or(|at| at <= now)
    }
}

/// Tenant and recipient scoping applied to every read and fan-out event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationScope {
    /// Tenant the viewer belongs to.
    pub tenant_id: TenantId,
    /// The viewing recipient.
    pub recipient_id: UserId,
}

impl NotificationScope {
    /// Creates a scope for one viewer.
    #[must_use]
    pub fn new(tenant_id: TenantId, recipient_id: UserId) -> Self {
        Self {
            tenant_id,
            recipient_id,
        }
    }

    /// Whether the row is addressed to this viewer: same tenant, and either
    /// a tenant broadcast or addressed to the recipient specifically.
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        notification.tenant_id == self.tenant_id
            && notification
                .recipient_id
                .is_none_or(|recipient| recipient == self.recipient_id)
    }
}

/// Caller-supplied portion of a notification. Identifier, flags, and
/// timestamps are assigned at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Addressee; `None` broadcasts to the whole tenant.
    pub recipient_id: Option<UserId>,
    /// Template or event tag.
    pub kind: String,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Opaque structured payload.
    pub data: Option<serde_json::Value>,
    /// Delivery urgency.
    pub priority: NotificationPriority,
    /// Topical grouping.
    pub category: NotificationCategory,
    /// Channels to deliver on.
    pub channels: Vec<NotificationChannel>,
    /// Hidden from reads at and after this instant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Dispatch is deferred until this instant.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Attached action buttons.
    pub actions: Vec<NotificationAction>,
}

impl NotificationDraft {
    /// Validates the draft's structural invariants.
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation(
                "notification title must not be empty".to_owned(),
            ));
        }

        if self.message.trim().is_empty() {
            return Err(AppError::Validation(
                "notification message must not be empty".to_owned(),
            ));
        }

        if self.channels.is_empty() {
            return Err(AppError::Validation(
                "notification must list at least one channel".to_owned(),
            ));
        }

        if let (Some(scheduled_for), Some(expires_at)) = (self.scheduled_for, self.expires_at)
            && expires_at <= scheduled_for
        {
            return Err(AppError::Validation(
                "notification would expire before its scheduled dispatch".to_owned(),
            ));
        }

        Ok(())
    }

    /// Materializes the draft into a fresh unread row.
    #[must_use]
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            tenant_id: self.tenant_id,
            recipient_id: self.recipient_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            data: self.data,
            priority: self.priority,
            category: self.category,
            channels: self.channels,
            is_read: false,
            is_archived: false,
            expires_at: self.expires_at,
            scheduled_for: self.scheduled_for,
            created_at: now,
            updated_at: now,
            actions: self.actions,
        }
    }

    /// Reminder for an upcoming appointment. Expires once the slot starts.
    #[must_use]
    pub fn appointment_reminder(
        tenant_id: TenantId,
        recipient_id: UserId,
        patient_name: &str,
        starts_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            recipient_id: Some(recipient_id),
            kind: "appointment_reminder".to_owned(),
            title: "Upcoming appointment".to_owned(),
            message: format!(
                "Appointment with {patient_name} at {}",
                starts_at.format("%Y-%m-%d %H:%M UTC")
            ),
            data: Some(serde_json::json!({ "starts_at": starts_at })),
            priority: NotificationPriority::High,
            category: NotificationCategory::Appointment,
            channels: vec![
                NotificationChannel::InApp,
                NotificationChannel::Email,
                NotificationChannel::Sms,
            ],
            expires_at: Some(starts_at),
            scheduled_for: None,
            actions: vec![
                NotificationAction::navigate("view", "View appointment", "/appointments"),
                NotificationAction::invoke("confirm", "Confirm", "/api/appointments/confirm"),
                NotificationAction::dismiss(),
            ],
        }
    }

    /// Payment-due notice for an open invoice.
    #[must_use]
    pub fn payment_due(
        tenant_id: TenantId,
        recipient_id: UserId,
        invoice_number: &str,
        due_on: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            recipient_id: Some(recipient_id),
            kind: "payment_due".to_owned(),
            title: "Payment due".to_owned(),
            message: format!(
                "Invoice {invoice_number} is due on {}",
                due_on.format("%Y-%m-%d")
            ),
            data: Some(serde_json::json!({ "invoice_number": invoice_number })),
            priority: NotificationPriority::Medium,
            category: NotificationCategory::Billing,
            channels: vec![NotificationChannel::InApp, NotificationChannel::Email],
            expires_at: None,
            scheduled_for: None,
            actions: vec![
                NotificationAction::navigate("view", "View invoice", "/billing"),
                NotificationAction::dismiss(),
            ],
        }
    }

    /// Tenant-wide operational alert.
    #[must_use]
    pub fn system_alert(tenant_id: TenantId, title: &str, message: &str) -> Self {
        Self {
            tenant_id,
            recipient_id: None,
            kind: "system_alert".to_owned(),
            title: title.to_owned(),
            message: message.to_owned(),
            data: None,
            priority: NotificationPriority::Urgent,
            category: NotificationCategory::System,
            channels: vec![NotificationChannel::InApp, NotificationChannel::Push],
            expires_at: None,
            scheduled_for: None,
            actions: vec![NotificationAction::dismiss()],
        }
    }

    /// Greeting for a newly provisioned account.
    #[must_use]
    pub fn welcome(tenant_id: TenantId, recipient_id: UserId, display_name: &str) -> Self {
        Self {
            tenant_id,
            recipient_id: Some(recipient_id),
            kind: "welcome".to_owned(),
            title: "Welcome".to_owned(),
            message: format!("Welcome aboard, {display_name}."),
            data: None,
            priority: NotificationPriority::Low,
            category: NotificationCategory::System,
            channels: vec![NotificationChannel::InApp],
            expires_at: None,
            scheduled_for: None,
            actions: vec![NotificationAction::navigate(
                "start",
                "Get started",
                "/dashboard",
            )],
        }
    }
}
