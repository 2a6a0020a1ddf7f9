//! Append-only audit record shapes.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use clinicore_core::{AppError, TenantId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review weight assigned to an audit record. Denials are high by policy:
/// they are the actionable signal for security review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Routine, expected activity.
    Low,
    /// Activity worth sampling during review.
    Medium,
    /// Activity reviewed individually.
    High,
}

impl RiskLevel {
    /// Returns a stable storage value for this level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(AppError::Validation(format!(
                "unknown risk level '{value}'"
            ))),
        }
    }
}

/// Stable audit actions emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An authorization check passed.
    AccessGranted,
    /// An authorization check failed because the role tag was unknown.
    AccessRoleDenied,
    /// An authorization check failed on the permission table.
    AccessPermissionDenied,
    /// A sensitive-feature gate rejected the role.
    AccessSensitiveFeatureDenied,
    /// A user signed in.
    SignedIn,
    /// A user signed out.
    SignedOut,
    /// A session expired from inactivity.
    SessionExpired,
    /// A clinical record was opened.
    RecordAccessed,
    /// A financial record was opened.
    FinancialAccessed,
    /// A batch of notifications was marked read.
    NotificationsRead,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessGranted => "access.granted",
            Self::AccessRoleDenied => "access.role_denied",
            Self::AccessPermissionDenied => "access.permission_denied",
            Self::AccessSensitiveFeatureDenied => "access.sensitive_feature_denied",
            Self::SignedIn => "auth.signed_in",
            Self::SignedOut => "auth.signed_out",
            Self::SessionExpired => "session.expired",
            Self::RecordAccessed => "record.accessed",
            Self::FinancialAccessed => "financial.accessed",
            Self::NotificationsRead => "notification.read",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "access.granted" => Ok(Self::AccessGranted),
            "access.role_denied" => Ok(Self::AccessRoleDenied),
            "access.permission_denied" => Ok(Self::AccessPermissionDenied),
            "access.sensitive_feature_denied" => Ok(Self::AccessSensitiveFeatureDenied),
            "auth.signed_in" => Ok(Self::SignedIn),
            "auth.signed_out" => Ok(Self::SignedOut),
            "session.expired" => Ok(Self::SessionExpired),
            "record.accessed" => Ok(Self::RecordAccessed),
            "financial.accessed" => Ok(Self::FinancialAccessed),
            "notification.read" => Ok(Self::NotificationsRead),
            _ => Err(AppError::Validation(format!(
                "unknown audit action '{value}'"
            ))),
        }
    }
}

/// One immutable row of the audit trail. Written once, never updated or
/// deleted by this core; ordering is timestamp order, best effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Stable record identifier.
    pub id: Uuid,
    /// User that performed the action.
    pub actor_id: UserId,
    /// Tenant scope for the record.
    pub tenant_id: TenantId,
    /// What happened.
    pub action: AuditAction,
    /// Resource tag the action touched.
    pub resource: String,
    /// Specific record identifier, when one applies.
    pub resource_id: Option<String>,
    /// Opaque structured payload.
    pub details: Option<serde_json::Value>,
    /// Caller network origin, `"unknown"` when unresolvable.
    pub ip_address: String,
    /// Caller agent string, `"unknown"` when unresolvable.
    pub client_agent: String,
    /// Event timestamp, client clock.
    pub timestamp: DateTime<Utc>,
    /// Review weight.
    pub risk_level: RiskLevel,
}

/// Caller-supplied portion of an audit record. Identifier, timestamp, and
/// client context are filled in by the audit service.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecordDraft {
    /// User that performed the action.
    pub actor_id: UserId,
    /// Tenant scope for the record.
    pub tenant_id: TenantId,
    /// What happened.
    pub action: AuditAction,
    /// Resource tag the action touched.
    pub resource: String,
    /// Specific record identifier, when one applies.
    pub resource_id: Option<String>,
    /// Opaque structured payload.
    pub details: Option<serde_json::Value>,
    /// Review weight.
    pub risk_level: RiskLevel,
}
