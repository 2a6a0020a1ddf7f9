//! Roles, permissions, and the static tables backing the permission engine.
//!
//! All checks here are pure functions over tables fixed at compile time.
//! Unknown roles or action tags deny; nothing on the authorization path
//! returns an error a caller could mistake for an allow.

use std::str::FromStr;

use clinicore_core::AppError;
use serde::{Deserialize, Serialize};

/// Roles recognized by the permission engine. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator with unrestricted access across tenants.
    PlatformAdmin,
    /// Administrator of a single clinic.
    TenantAdmin,
    /// Clinician with full chart and scheduling access.
    ClinicianFull,
    /// Clinician restricted to assigned patients.
    ClinicianLimited,
    /// Reception and scheduling staff.
    FrontDesk,
    /// Support staff with diagnostic read access.
    SupportEngineer,
    /// Patient portal account.
    Patient,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlatformAdmin => "platform_admin",
            Self::TenantAdmin => "tenant_admin",
            Self::ClinicianFull => "clinician_full",
            Self::ClinicianLimited => "clinician_limited",
            Self::FrontDesk => "front_desk",
            Self::SupportEngineer => "support_engineer",
            Self::Patient => "patient",
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[
            Role::PlatformAdmin,
            Role::TenantAdmin,
            Role::ClinicianFull,
            Role::ClinicianLimited,
            Role::FrontDesk,
            Role::SupportEngineer,
            Role::Patient,
        ];

        ALL
    }

    /// Rank used only by [`can_manage`] for manager-over-subordinate checks.
    /// Never consulted for resource access.
    #[must_use]
    pub fn hierarchy_rank(&self) -> u8 {
        match self {
            Self::PlatformAdmin => 100,
            Self::TenantAdmin => 80,
            Self::ClinicianFull => 60,
            Self::ClinicianLimited => 50,
            Self::FrontDesk => 40,
            Self::SupportEngineer => 30,
            Self::Patient => 10,
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "platform_admin" => Ok(Self::PlatformAdmin),
            "tenant_admin" => Ok(Self::TenantAdmin),
            "clinician_full" => Ok(Self::ClinicianFull),
            "clinician_limited" => Ok(Self::ClinicianLimited),
            "front_desk" => Ok(Self::FrontDesk),
            "support_engineer" => Ok(Self::SupportEngineer),
            "patient" => Ok(Self::Patient),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

/// Action half of a permission pair. `Manage` subsumes the other four on the
/// same resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    /// Create new records of the resource.
    Create,
    /// Read records of the resource.
    Read,
    /// Update existing records of the resource.
    Update,
    /// Delete records of the resource.
    Delete,
    /// Full control, implying every other action.
    Manage,
}

impl ResourceAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ResourceAction] = &[
            ResourceAction::Create,
            ResourceAction::Read,
            ResourceAction::Update,
            ResourceAction::Delete,
            ResourceAction::Manage,
        ];

        ALL
    }
}

impl FromStr for ResourceAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "manage" => Ok(Self::Manage),
            _ => Err(AppError::Validation(format!(
                "unknown resource action '{value}'"
            ))),
        }
    }
}

/// Resource tag granting everything when paired with [`ResourceAction::Manage`].
/// Reserved for [`Role::PlatformAdmin`]. Any other pairing with `*` matches
/// nothing.
pub const WILDCARD_RESOURCE: &str = "*";

/// Resource tags used by the permission tables and the route registry.
pub mod resources {
    /// Patient charts and demographics.
    pub const PATIENT: &str = "patient";
    /// Appointment and scheduling records.
    pub const APPOINTMENT: &str = "appointment";
    /// Invoices, payments, and claims.
    pub const FINANCIAL: &str = "financial";
    /// Stock and supplies.
    pub const INVENTORY: &str = "inventory";
    /// Staff records and rosters.
    pub const STAFF: &str = "staff";
    /// Reporting views.
    pub const REPORT: &str = "report";
    /// Tenant configuration.
    pub const SETTINGS: &str = "settings";
    /// The audit trail read model.
    pub const AUDIT: &str = "audit";
    /// Notification records.
    pub const NOTIFICATION: &str = "notification";
}

/// A `(resource, action)` grant held by a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Permission {
    /// Literal resource tag; no prefix or glob matching.
    pub resource: &'static str,
    /// Granted action.
    pub action: ResourceAction,
}

const fn grant(resource: &'static str, action: ResourceAction) -> Permission {
    Permission { resource, action }
}

const PLATFORM_ADMIN_GRANTS: &[Permission] = &[grant(WILDCARD_RESOURCE, ResourceAction::Manage)];

const TENANT_ADMIN_GRANTS: &[Permission] = &[
    grant(resources::PATIENT, ResourceAction::Manage),
    grant(resources::APPOINTMENT, ResourceAction::Manage),
    grant(resources::FINANCIAL, ResourceAction::Manage),
    grant(resources::INVENTORY, ResourceAction::Manage),
    grant(resources::STAFF, ResourceAction::Manage),
    grant(resources::REPORT, ResourceAction::Manage),
    grant(resources::SETTINGS, ResourceAction::Manage),
    grant(resources::NOTIFICATION, ResourceAction::Manage),
    grant(resources::AUDIT, ResourceAction::Read),
];

const CLINICIAN_FULL_GRANTS: &[Permission] = &[
    grant(resources::PATIENT, ResourceAction::Manage),
    grant(resources::APPOINTMENT, ResourceAction::Manage),
    grant(resources::FINANCIAL, ResourceAction::Read),
    grant(resources::INVENTORY, ResourceAction::Read),
    grant(resources::REPORT, ResourceAction::Create),
    grant(resources::REPORT, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Update),
];

const CLINICIAN_LIMITED_GRANTS: &[Permission] = &[
    grant(resources::PATIENT, ResourceAction::Read),
    grant(resources::PATIENT, ResourceAction::Update),
    grant(resources::APPOINTMENT, ResourceAction::Read),
    grant(resources::APPOINTMENT, ResourceAction::Update),
    grant(resources::INVENTORY, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Update),
];

const FRONT_DESK_GRANTS: &[Permission] = &[
    grant(resources::PATIENT, ResourceAction::Create),
    grant(resources::PATIENT, ResourceAction::Read),
    grant(resources::PATIENT, ResourceAction::Update),
    grant(resources::APPOINTMENT, ResourceAction::Manage),
    grant(resources::FINANCIAL, ResourceAction::Create),
    grant(resources::FINANCIAL, ResourceAction::Read),
    grant(resources::INVENTORY, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Update),
];

const SUPPORT_ENGINEER_GRANTS: &[Permission] = &[
    grant(resources::SETTINGS, ResourceAction::Read),
    grant(resources::AUDIT, ResourceAction::Read),
    grant(resources::REPORT, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Read),
];

const PATIENT_GRANTS: &[Permission] = &[
    grant(resources::APPOINTMENT, ResourceAction::Create),
    grant(resources::APPOINTMENT, ResourceAction::Read),
    grant(resources::FINANCIAL, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Read),
    grant(resources::NOTIFICATION, ResourceAction::Update),
];

/// Returns the ordered permission set granted to a role.
///
/// Invariants, checked by tests: every role maps to a non-empty set, and
/// only [`Role::PlatformAdmin`] holds the `(*, manage)` wildcard.
#[must_use]
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::PlatformAdmin => PLATFORM_ADMIN_GRANTS,
        Role::TenantAdmin => TENANT_ADMIN_GRANTS,
        Role::ClinicianFull => CLINICIAN_FULL_GRANTS,
        Role::ClinicianLimited => CLINICIAN_LIMITED_GRANTS,
        Role::FrontDesk => FRONT_DESK_GRANTS,
        Role::SupportEngineer => SUPPORT_ENGINEER_GRANTS,
        Role::Patient => PATIENT_GRANTS,
    }
}

/// Decides whether a role may perform an action on a resource.
///
/// True iff the role's set contains `(*, manage)`, the literal
/// `(resource, action)` pair, or `(resource, manage)`.
#[must_use]
pub fn has_permission(role: Role, resource: &str, action: ResourceAction) -> bool {
    role_permissions(role).iter().any(|held| {
        (held.resource == WILDCARD_RESOURCE && held.action == ResourceAction::Manage)
            || (held.resource == resource
                && (held.action == action || held.action == ResourceAction::Manage))
    })
}

/// String entry point for guards fed by untyped route tables.
///
/// Any tag that fails to parse denies; this path never surfaces an error.
#[must_use]
pub fn has_permission_tags(role: &str, resource: &str, action: &str) -> bool {
    match (Role::from_str(role), ResourceAction::from_str(action)) {
        (Ok(role), Ok(action)) => has_permission(role, resource, action),
        _ => false,
    }
}

/// Named capabilities gating whole UI surfaces rather than a single
/// `(resource, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveFeature {
    /// Cross-tenant platform administration dashboard.
    SystemAdministration,
    /// Audit trail browser.
    AuditTrail,
    /// Revenue and financial reporting views.
    FinancialReports,
    /// Staff records and role administration.
    StaffManagement,
    /// Third-party integration configuration.
    IntegrationSettings,
}

impl SensitiveFeature {
    /// Returns a stable storage value for this feature.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAdministration => "system_administration",
            Self::AuditTrail => "audit_trail",
            Self::FinancialReports => "financial_reports",
            Self::StaffManagement => "staff_management",
            Self::IntegrationSettings => "integration_settings",
        }
    }

    /// Returns all known sensitive features.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[SensitiveFeature] = &[
            SensitiveFeature::SystemAdministration,
            SensitiveFeature::AuditTrail,
            SensitiveFeature::FinancialReports,
            SensitiveFeature::StaffManagement,
            SensitiveFeature::IntegrationSettings,
        ];

        ALL
    }
}

impl FromStr for SensitiveFeature {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "system_administration" => Ok(Self::SystemAdministration),
            "audit_trail" => Ok(Self::AuditTrail),
            "financial_reports" => Ok(Self::FinancialReports),
            "staff_management" => Ok(Self::StaffManagement),
            "integration_settings" => Ok(Self::IntegrationSettings),
            _ => Err(AppError::Validation(format!(
                "unknown sensitive feature '{value}'"
            ))),
        }
    }
}

/// Returns the roles admitted to a sensitive feature.
#[must_use]
pub fn feature_roles(feature: SensitiveFeature) -> &'static [Role] {
    match feature {
        SensitiveFeature::SystemAdministration => &[Role::PlatformAdmin],
        SensitiveFeature::AuditTrail => {
            &[Role::PlatformAdmin, Role::TenantAdmin, Role::SupportEngineer]
        }
        SensitiveFeature::FinancialReports => &[Role::PlatformAdmin, Role::TenantAdmin],
        SensitiveFeature::StaffManagement => &[Role::PlatformAdmin, Role::TenantAdmin],
        SensitiveFeature::IntegrationSettings => {
            &[Role::PlatformAdmin, Role::TenantAdmin, Role::SupportEngineer]
        }
    }
}

/// Decides whether a role is admitted to a sensitive feature.
#[must_use]
pub fn has_sensitive_access(role: Role, feature: SensitiveFeature) -> bool {
    feature_roles(feature).contains(&role)
}

/// Whether `manager` outranks `subordinate` in the role hierarchy.
///
/// Strictly greater, so no role can manage itself. UI-level administration
/// check only; resource access always goes through [`has_permission`].
#[must_use]
pub fn can_manage(manager: Role, subordinate: Role) -> bool {
    manager.hierarchy_rank() > subordinate.hierarchy_rank()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::{
        Permission, ResourceAction, Role, SensitiveFeature, WILDCARD_RESOURCE, can_manage,
        has_permission, has_permission_tags, has_sensitive_access, resources, role_permissions,
    };

    #[test]
    fn every_role_has_grants() {
        for role in Role::all() {
            assert!(
                !role_permissions(*role).is_empty(),
                "role '{}' has an empty permission set",
                role.as_str()
            );
        }
    }

    #[test]
    fn only_platform_admin_holds_the_wildcard() {
        let holders: Vec<Role> = Role::all()
            .iter()
            .copied()
            .filter(|role| {
                role_permissions(*role).contains(&Permission {
                    resource: WILDCARD_RESOURCE,
                    action: ResourceAction::Manage,
                })
            })
            .collect();
        assert_eq!(holders, vec![Role::PlatformAdmin]);
    }

    #[test]
    fn wildcard_role_passes_every_check() {
        for action in ResourceAction::all() {
            assert!(has_permission(Role::PlatformAdmin, resources::STAFF, *action));
            assert!(has_permission(Role::PlatformAdmin, "anything-at-all", *action));
        }
    }

    #[test]
    fn manage_subsumes_other_actions_on_same_resource() {
        for action in ResourceAction::all() {
            assert!(has_permission(
                Role::TenantAdmin,
                resources::APPOINTMENT,
                *action
            ));
        }
    }

    #[test]
    fn front_desk_may_take_payments_but_not_manage_financials() {
        assert!(has_permission(
            Role::FrontDesk,
            resources::FINANCIAL,
            ResourceAction::Create
        ));
        assert!(!has_permission(
            Role::FrontDesk,
            resources::FINANCIAL,
            ResourceAction::Manage
        ));
    }

    #[test]
    fn unknown_tags_deny_without_error() {
        assert!(!has_permission_tags("superuser", resources::PATIENT, "read"));
        assert!(!has_permission_tags("front_desk", resources::PATIENT, "own"));
        assert!(has_permission_tags("front_desk", "patient", "read"));
    }

    #[test]
    fn sensitive_features_admit_listed_roles_only() {
        assert!(has_sensitive_access(
            Role::PlatformAdmin,
            SensitiveFeature::SystemAdministration
        ));
        assert!(!has_sensitive_access(
            Role::TenantAdmin,
            SensitiveFeature::SystemAdministration
        ));
        assert!(has_sensitive_access(
            Role::SupportEngineer,
            SensitiveFeature::AuditTrail
        ));
        assert!(!has_sensitive_access(
            Role::Patient,
            SensitiveFeature::FinancialReports
        ));
    }

    #[test]
    fn role_tags_round_trip() {
        for role in Role::all() {
            let parsed = Role::from_str(role.as_str());
            assert!(parsed.is_ok());
        }
        assert!(Role::from_str("receptionist").is_err());
    }

    fn any_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(Role::all().to_vec())
    }

    fn any_action() -> impl Strategy<Value = ResourceAction> {
        proptest::sample::select(ResourceAction::all().to_vec())
    }

    proptest! {
        #[test]
        fn default_deny_for_unlisted_resources(role in any_role(), action in any_action()) {
            if role != Role::PlatformAdmin {
                prop_assert!(!has_permission(role, "unregistered_resource", action));
            }
        }

        #[test]
        fn can_manage_matches_rank_order(left in any_role(), right in any_role()) {
            prop_assert_eq!(
                can_manage(left, right),
                left.hierarchy_rank() > right.hierarchy_rank()
            );
        }

        #[test]
        fn no_role_manages_itself(role in any_role()) {
            prop_assert!(!can_manage(role, role));
        }
    }
}
