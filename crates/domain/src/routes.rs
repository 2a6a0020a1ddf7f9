//! Static route registry consumed by the route guard.

use std::collections::BTreeSet;

use crate::access::{
    ResourceAction, Role, SensitiveFeature, has_permission, has_sensitive_access, resources,
};

/// Access requirement declared by a registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    /// Included for every authenticated session.
    Public,
    /// Requires a `(resource, action)` permission.
    Permission {
        /// Resource tag the route operates on.
        resource: &'static str,
        /// Action the route requires.
        action: ResourceAction,
    },
    /// Requires membership in a sensitive feature's role set.
    Feature(SensitiveFeature),
}

/// One registered route and its access requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    /// Route path as registered with the navigation layer.
    pub path: &'static str,
    /// Guard applied before the route is offered.
    pub guard: RouteGuard,
}

static ROUTES: &[RouteSpec] = &[
    RouteSpec {
        path: "/dashboard",
        guard: RouteGuard::Public,
    },
    RouteSpec {
        path: "/profile",
        guard: RouteGuard::Public,
    },
    RouteSpec {
        path: "/notifications",
        guard: RouteGuard::Public,
    },
    RouteSpec {
        path: "/patients",
        guard: RouteGuard::Permission {
            resource: resources::PATIENT,
            action: ResourceAction::Read,
        },
    },
    RouteSpec {
        path: "/appointments",
        guard: RouteGuard::Permission {
            resource: resources::APPOINTMENT,
            action: ResourceAction::Read,
        },
    },
    RouteSpec {
        path: "/billing",
        guard: RouteGuard::Permission {
            resource: resources::FINANCIAL,
            action: ResourceAction::Read,
        },
    },
    RouteSpec {
        path: "/inventory",
        guard: RouteGuard::Permission {
            resource: resources::INVENTORY,
            action: ResourceAction::Read,
        },
    },
    RouteSpec {
        path: "/staff",
        guard: RouteGuard::Permission {
            resource: resources::STAFF,
            action: ResourceAction::Read,
        },
    },
    RouteSpec {
        path: "/reports",
        guard: RouteGuard::Permission {
            resource: resources::REPORT,
            action: ResourceAction::Read,
        },
    },
    RouteSpec {
        path: "/settings",
        guard: RouteGuard::Permission {
            resource: resources::SETTINGS,
            action: ResourceAction::Read,
        },
    },
    RouteSpec {
        path: "/reports/financial",
        guard: RouteGuard::Feature(SensitiveFeature::FinancialReports),
    },
    RouteSpec {
        path: "/admin/system",
        guard: RouteGuard::Feature(SensitiveFeature::SystemAdministration),
    },
    RouteSpec {
        path: "/admin/audit",
        guard: RouteGuard::Feature(SensitiveFeature::AuditTrail),
    },
    RouteSpec {
        path: "/admin/staff",
        guard: RouteGuard::Feature(SensitiveFeature::StaffManagement),
    },
    RouteSpec {
        path: "/admin/integrations",
        guard: RouteGuard::Feature(SensitiveFeature::IntegrationSettings),
    },
];

/// Returns every registered route. Fixed at process start.
#[must_use]
pub fn route_registry() -> &'static [RouteSpec] {
    ROUTES
}

/// Returns the paths a role may access: base routes unconditionally, plus
/// every guarded route whose requirement the role satisfies.
#[must_use]
pub fn accessible_routes(role: Role) -> BTreeSet<&'static str> {
    ROUTES
        .iter()
        .filter(|route| match route.guard {
            RouteGuard::Public => true,
            RouteGuard::Permission { resource, action } => has_permission(role, resource, action),
            RouteGuard::Feature(feature) => has_sensitive_access(role, feature),
        })
        .map(|route| route.path)
        .collect()
}
