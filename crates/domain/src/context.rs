//! Authenticated user context resolved at sign-in.

use std::collections::BTreeSet;

use clinicore_core::{TenantId, UserId};
use serde::Serialize;

use crate::access::{Permission, ResourceAction, Role, has_permission, role_permissions};
use crate::routes::accessible_routes;

/// Everything the client layer needs to know about the signed-in user.
///
/// Resolved once from the role at sign-in and immutable for the session's
/// lifetime. A role change requires constructing a new context through
/// re-authentication or an explicit refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContext {
    id: UserId,
    email: Option<String>,
    role: Role,
    tenant_id: TenantId,
    display_name: String,
    permissions: Vec<Permission>,
    accessible_routes: BTreeSet<&'static str>,
}

impl UserContext {
    /// Resolves a context from authentication and tenancy data.
    #[must_use]
    pub fn resolve(
        id: UserId,
        email: Option<String>,
        display_name: impl Into<String>,
        role: Role,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            id,
            email,
            role,
            tenant_id,
            display_name: display_name.into(),
            permissions: role_permissions(role).to_vec(),
            accessible_routes: accessible_routes(role),
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the email, if the identity provider supplied one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the role the context was resolved from.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the tenant the user belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the permissions resolved from the role.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Returns the routes the role may access.
    #[must_use]
    pub fn accessible_routes(&self) -> &BTreeSet<&'static str> {
        &self.accessible_routes
    }

    /// Convenience permission check against the resolved role.
    #[must_use]
    pub fn can(&self, resource: &str, action: ResourceAction) -> bool {
        has_permission(self.role, resource, action)
    }
}
