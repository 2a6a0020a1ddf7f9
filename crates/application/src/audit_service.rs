//! Fire-and-forget audit recording.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clinicore_core::{AppResult, TenantId, UserId};
use clinicore_domain::{AuditAction, AuditRecord, AuditRecordDraft, RiskLevel, resources};
use tracing::warn;
use uuid::Uuid;

/// Network origin and agent string attached to every audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    /// Caller IP address.
    pub ip_address: String,
    /// Caller agent string.
    pub client_agent: String,
}

impl ClientContext {
    /// Fallback context when resolution fails.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            ip_address: "unknown".to_owned(),
            client_agent: "unknown".to_owned(),
        }
    }
}

/// Port resolving the caller's network context. Best effort; a failure must
/// never block the audit write.
#[async_trait]
pub trait ClientContextResolver: Send + Sync {
    /// Resolves the current client context.
    async fn resolve(&self) -> AppResult<ClientContext>;
}

/// Port for the append-only audit trail. One write call per record.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persists one audit record.
    async fn append(&self, record: AuditRecord) -> AppResult<()>;
}

/// Records audit events without ever failing the audited operation.
///
/// Transport failures are logged locally and the record is dropped; a denied
/// permission check stays denied even when its audit write fails.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
    resolver: Arc<dyn ClientContextResolver>,
}

impl AuditService {
    /// Creates a service from store and resolver implementations.
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, resolver: Arc<dyn ClientContextResolver>) -> Self {
        Self { store, resolver }
    }

    /// Records one audit event, assigning identifier, timestamp, and client
    /// context. Fire-and-forget.
    pub async fn record(&self, draft: AuditRecordDraft) {
        let context = match self.resolver.resolve().await {
            Ok(context) => context,
            Err(error) => {
                warn!(%error, "client context resolution failed");
                ClientContext::unknown()
            }
        };

        let record = AuditRecord {
            id: Uuid::new_v4(),
            actor_id: draft.actor_id,
            tenant_id: draft.tenant_id,
            action: draft.action,
            resource: draft.resource,
            resource_id: draft.resource_id,
            details: draft.details,
            ip_address: context.ip_address,
            client_agent: context.client_agent,
            timestamp: Utc::now(),
            risk_level: draft.risk_level,
        };

        if let Err(error) = self.store.append(record).await {
            warn!(%error, "audit append failed, dropping record");
        }
    }

    /// Records a clinical record access. Resource and risk pre-filled.
    pub async fn record_access(
        &self,
        actor_id: UserId,
        tenant_id: TenantId,
        record_id: impl Into<String>,
    ) {
        self.record(AuditRecordDraft {
            actor_id,
            tenant_id,
            action: AuditAction::RecordAccessed,
            resource: resources::PATIENT.to_owned(),
            resource_id: Some(record_id.into()),
            details: None,
            risk_level: RiskLevel::Medium,
        })
        .await;
    }

    /// Records a financial record access. Resource and risk pre-filled.
    pub async fn financial_access(
        &self,
        actor_id: UserId,
        tenant_id: TenantId,
        record_id: impl Into<String>,
    ) {
        self.record(AuditRecordDraft {
            actor_id,
            tenant_id,
            action: AuditAction::FinancialAccessed,
            resource: resources::FINANCIAL.to_owned(),
            resource_id: Some(record_id.into()),
            details: None,
            risk_level: RiskLevel::Medium,
        })
        .await;
    }

    /// Records a sign-in or sign-out. Failed attempts weigh medium.
    pub async fn authentication(
        &self,
        actor_id: UserId,
        tenant_id: TenantId,
        action: AuditAction,
        succeeded: bool,
    ) {
        self.record(AuditRecordDraft {
            actor_id,
            tenant_id,
            action,
            resource: "auth".to_owned(),
            resource_id: None,
            details: Some(serde_json::json!({
                "outcome": if succeeded { "success" } else { "failure" },
            })),
            risk_level: if succeeded {
                RiskLevel::Low
            } else {
                RiskLevel::Medium
            },
        })
        .await;
    }
}
