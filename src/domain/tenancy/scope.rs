//! Read scoping for tenant-owned entities.
//!
//! Every repository read takes a [`TenantScope`] and must honor it. The
//! scope is derived from the acting principal once per operation and then
//! applied mechanically: in-memory adapters filter rows with
//! [`TenantScope::permits`], the Postgres adapters translate the same
//! decision into `WHERE` clauses.
//!
//! Filtering failures surface as "not found", never "forbidden" — a
//! caller must not learn that another tenant's record exists.

use crate::domain::foundation::TenantId;

use super::Principal;

/// Visibility boundary applied to reads of tenant-owned entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// No filtering. Sees rows of every tenant, including unowned rows.
    Unrestricted,

    /// Rows of exactly one tenant.
    Tenant(TenantId),

    /// No rows at all. Applied to tenant-less, non-privileged principals
    /// so that a missing tenant binding fails closed.
    Denied,
}

impl TenantScope {
    /// Derives the scope for an acting principal.
    ///
    /// - privileged role: [`TenantScope::Unrestricted`]
    /// - tenant-bound principal: [`TenantScope::Tenant`]
    /// - tenant-less and non-privileged: [`TenantScope::Denied`]
    pub fn for_principal(principal: &Principal) -> Self {
        if principal.is_privileged() {
            return TenantScope::Unrestricted;
        }
        match principal.tenant {
            Some(tenant) => TenantScope::Tenant(tenant),
            None => TenantScope::Denied,
        }
    }

    /// Explicit escape hatch for privileged operational paths
    /// (reconciliation, billing sweeps, cross-tenant reports).
    ///
    /// Call sites must opt in deliberately; no read is unscoped by
    /// default.
    pub fn unrestricted() -> Self {
        TenantScope::Unrestricted
    }

    /// Explicit filter to an arbitrary tenant, for privileged
    /// cross-tenant inspection.
    pub fn tenant(id: TenantId) -> Self {
        TenantScope::Tenant(id)
    }

    /// Row predicate: may a row owned by `owner` be returned under this
    /// scope?
    ///
    /// Unowned rows (`None`) are visible only to the unrestricted scope.
    pub fn permits(&self, owner: Option<TenantId>) -> bool {
        match self {
            TenantScope::Unrestricted => true,
            TenantScope::Tenant(tenant) => owner == Some(*tenant),
            TenantScope::Denied => false,
        }
    }
}
