//! Tenant ownership inheritance.
//!
//! tenant_id is assigned exactly once, at creation, by consulting the
//! record's designated parent (Service -> Customer, Invoice -> Service,
//! Ticket -> Customer). Once stored it is never recomputed or reassigned.
//!
//! The resolution is an explicit call in each entity's construction path,
//! executed before the first repository write — there is no lifecycle-hook
//! magic to trace through.

use std::future::Future;

use crate::domain::foundation::TenantId;

/// Resolves the owning tenant for a record about to be created.
///
/// If the record already carries a tenant (e.g., copied from the acting
/// principal), it is kept. Otherwise the declared parent is fetched and
/// its tenant copied. A missing parent, or a parent that is itself
/// unowned, yields `None` — the record stays globally owned. Callers that
/// require a mandatory tenant binding must validate parent existence
/// before creation.
pub async fn resolve_owner_tenant<F, Fut>(
    assigned: Option<TenantId>,
    parent_owner: F,
) -> Option<TenantId>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<Option<TenantId>>>,
{
    if assigned.is_some() {
        return assigned;
    }
    parent_owner().await.flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: i64) -> TenantId {
        TenantId::new(id).unwrap()
    }

    #[tokio::test]
    async fn keeps_already_assigned_tenant() {
        let resolved = resolve_owner_tenant(Some(tenant(1)), || async {
            Some(Some(tenant(2)))
        })
        .await;
        assert_eq!(resolved, Some(tenant(1)));
    }

    #[tokio::test]
    async fn inherits_parent_tenant_when_unassigned() {
        let resolved = resolve_owner_tenant(None, || async { Some(Some(tenant(2))) }).await;
        assert_eq!(resolved, Some(tenant(2)));
    }

    #[tokio::test]
    async fn unowned_parent_leaves_record_unowned() {
        let resolved = resolve_owner_tenant(None, || async { Some(None) }).await;
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn missing_parent_leaves_record_unowned() {
        let resolved = resolve_owner_tenant(None, || async { None }).await;
        assert_eq!(resolved, None);
    }
}
