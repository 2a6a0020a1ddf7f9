//! Authorization guard for routes and UI actions.

use std::collections::BTreeSet;

use clinicore_core::{TenantId, UserId};
use clinicore_domain::{
    AuditAction, AuditRecordDraft, ResourceAction, RiskLevel, Role, SensitiveFeature,
    accessible_routes, has_permission, has_sensitive_access,
};

use crate::AuditService;

/// Wraps the pure permission engine and records every decision on the audit
/// trail: denials at high risk, sensitive-feature grants at low risk, and
/// ordinary grants at medium risk.
///
/// Denials are boolean, never errors; callers surface the denied state.
#[derive(Clone)]
pub struct AuthorizationService {
    audit: AuditService,
}

impl AuthorizationService {
    /// Creates a guard recording decisions through the given audit service.
    #[must_use]
    pub fn new(audit: AuditService) -> Self {
        Self { audit }
    }

    /// Decides `(role, resource, action)` and audits the decision.
    pub async fn authorize(
        &self,
        actor_id: UserId,
        tenant_id: TenantId,
        role: Role,
        resource: &str,
        action: ResourceAction,
    ) -> bool {
        let granted = has_permission(role, resource, action);
        let (audit_action, risk_level) = if granted {
            (AuditAction::AccessGranted, RiskLevel::Medium)
        } else {
            (AuditAction::AccessPermissionDenied, RiskLevel::High)
        };

        self.audit
            .record(AuditRecordDraft {
                actor_id,
                tenant_id,
                action: audit_action,
                resource: resource.to_owned(),
                resource_id: None,
                details: Some(serde_json::json!({
                    "role": role.as_str(),
                    "action": action.as_str(),
                })),
                risk_level,
            })
            .await;

        granted
    }

    /// String entry point for guards fed by untyped route tables.
    ///
    /// An unknown role tag denies and audits as a role denial; an unknown
    /// action tag denies and audits as a permission denial. Exactly one
    /// audit record per evaluation.
    pub async fn authorize_tags(
        &self,
        actor_id: UserId,
        tenant_id: TenantId,
        role: &str,
        resource: &str,
        action: &str,
    ) -> bool {
        let Ok(parsed_role) = role.parse::<Role>() else {
            self.audit
                .record(AuditRecordDraft {
                    actor_id,
                    tenant_id,
                    action: AuditAction::AccessRoleDenied,
                    resource: resource.to_owned(),
                    resource_id: None,
                    details: Some(serde_json::json!({
                        "role": role,
                        "action": action,
                    })),
                    risk_level: RiskLevel::High,
                })
                .await;
            return false;
        };

        let Ok(parsed_action) = action.parse::<ResourceAction>() else {
            self.audit
                .record(AuditRecordDraft {
                    actor_id,
                    tenant_id,
                    action: AuditAction::AccessPermissionDenied,
                    resource: resource.to_owned(),
                    resource_id: None,
                    details: Some(serde_json::json!({
                        "role": role,
                        "action": action,
                    })),
                    risk_level: RiskLevel::High,
                })
                .await;
            return false;
        };

        self.authorize(actor_id, tenant_id, parsed_role, resource, parsed_action)
            .await
    }

    /// Decides a sensitive-feature gate and audits the decision.
    pub async fn authorize_feature(
        &self,
        actor_id: UserId,
        tenant_id: TenantId,
        role: Role,
        feature: SensitiveFeature,
    ) -> bool {
        let granted = has_sensitive_access(role, feature);
        let (audit_action, risk_level) = if granted {
            (AuditAction::AccessGranted, RiskLevel::Low)
        } else {
            (AuditAction::AccessSensitiveFeatureDenied, RiskLevel::High)
        };

        self.audit
            .record(AuditRecordDraft {
                actor_id,
                tenant_id,
                action: audit_action,
                resource: feature.as_str().to_owned(),
                resource_id: None,
                details: Some(serde_json::json!({ "role": role.as_str() })),
                risk_level,
            })
            .await;

        granted
    }

    /// Routes the role may access. Pure derivation, not audited.
    #[must_use]
    pub fn accessible_routes(&self, role: Role) -> BTreeSet<&'static str> {
        accessible_routes(role)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use clinicore_core::{AppResult, TenantId, UserId};
    use clinicore_domain::{
        AuditAction, AuditRecord, ResourceAction, RiskLevel, Role, SensitiveFeature, resources,
    };
    use tokio::sync::Mutex;

    use crate::{AuditService, AuditStore, ClientContext, ClientContextResolver};

    use super::AuthorizationService;

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

    fn guard_with_store() -> (AuthorizationService, Arc<FakeAuditStore>) {
        let store = Arc::new(FakeAuditStore::default());
        let guard =
            AuthorizationService::new(AuditService::new(store.clone(), Arc::new(FakeResolver)));
        (guard, store)
    }

    #[tokio::test]
    async fn front_desk_payment_decisions_audit_with_expected_risk() {
        let (guard, store) = guard_with_store();
        let actor_id = UserId::new();
        let tenant_id = TenantId::new();

        let denied = guard
            .authorize(
                actor_id,
                tenant_id,
                Role::FrontDesk,
                resources::FINANCIAL,
                ResourceAction::Manage,
            )
            .await;
        assert!(!denied);

        let granted = guard
            .authorize(
                actor_id,
                tenant_id,
                Role::FrontDesk,
                resources::FINANCIAL,
                ResourceAction::Create,
            )
            .await;
        assert!(granted);

        let records = store.records.lock().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::AccessPermissionDenied);
        assert_eq!(records[0].risk_level, RiskLevel::High);
        assert_eq!(records[1].action, AuditAction::AccessGranted);
        assert_eq!(records[1].risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn unknown_role_tag_denies_and_audits_role_denial() {
        let (guard, store) = guard_with_store();

        let granted = guard
            .authorize_tags(
                UserId::new(),
                TenantId::new(),
                "superuser",
                resources::PATIENT,
                "read",
            )
            .await;
        assert!(!granted);

        let records = store.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::AccessRoleDenied);
        assert_eq!(records[0].risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn unknown_action_tag_denies_and_audits_once() {
        let (guard, store) = guard_with_store();

        let granted = guard
            .authorize_tags(
                UserId::new(),
                TenantId::new(),
                "front_desk",
                resources::PATIENT,
                "own",
            )
            .await;
        assert!(!granted);

        let records = store.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::AccessPermissionDenied);
    }

    #[tokio::test]
    async fn sensitive_feature_grant_audits_low_denial_high() {
        let (guard, store) = guard_with_store();
        let actor_id = UserId::new();
        let tenant_id = TenantId::new();

        let granted = guard
            .authorize_feature(
                actor_id,
                tenant_id,
                Role::TenantAdmin,
                SensitiveFeature::FinancialReports,
            )
            .await;
        assert!(granted);

        let denied = guard
            .authorize_feature(
                actor_id,
                tenant_id,
                Role::FrontDesk,
                SensitiveFeature::FinancialReports,
            )
            .await;
        assert!(!denied);

        let records = store.records.lock().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::AccessGranted);
        assert_eq!(records[0].risk_level, RiskLevel::Low);
        assert_eq!(
            records[1].action,
            AuditAction::AccessSensitiveFeatureDenied
        );
        assert_eq!(records[1].risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn wildcard_role_is_granted_everywhere() {
        let (guard, _store) = guard_with_store();

        let granted = guard
            .authorize(
                UserId::new(),
                TenantId::new(),
                Role::PlatformAdmin,
                "anything",
                ResourceAction::Delete,
            )
            .await;
        assert!(granted);
    }
}
