//! Acting principal for tenant resolution.
//!
//! The principal is an explicit value passed into every scoped operation.
//! Nothing in this crate reads the "current user" from ambient state; the
//! HTTP layer builds a `Principal` per request and hands it down.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, UserId};

/// Role of the acting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator. Sees every tenant's data and unowned records.
    SuperAdmin,

    /// Reseller staff, bound to one tenant.
    Reseller,

    /// Field technician, bound to one tenant.
    Technician,

    /// End customer self-service.
    Customer,
}

/// The authenticated actor behind an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Auth subject from the identity provider.
    pub user_id: UserId,

    /// Tenant this principal belongs to. `None` for platform-level
    /// accounts (privileged or not).
    pub tenant: Option<TenantId>,

    /// Role determining privilege level.
    pub role: Role,
}

impl Principal {
    /// Creates a principal bound to a tenant.
    pub fn new(user_id: UserId, tenant: Option<TenantId>, role: Role) -> Self {
        Self {
            user_id,
            tenant,
            role,
        }
    }

    /// Creates a platform operator principal (no tenant, full visibility).
    pub fn super_admin(user_id: UserId) -> Self {
        Self {
            user_id,
            tenant: None,
            role: Role::SuperAdmin,
        }
    }

    /// True if this principal bypasses tenant filtering entirely.
    pub fn is_privileged(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn super_admin_is_privileged() {
        let principal = Principal::super_admin(user("root"));
        assert!(principal.is_privileged());
        assert!(principal.tenant.is_none());
    }

    #[test]
    fn reseller_is_not_privileged() {
        let tenant = TenantId::new(1).unwrap();
        let principal = Principal::new(user("staff-1"), Some(tenant), Role::Reseller);
        assert!(!principal.is_privileged());
        assert_eq!(principal.tenant, Some(tenant));
    }
}
