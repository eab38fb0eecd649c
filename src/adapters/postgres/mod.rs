//! PostgreSQL repository adapters (sqlx).
//!
//! Every tenant-scoped read carries the same predicate, bound uniformly
//! as two parameters: an unrestricted flag and an optional tenant id.
//! `(flag=true, None)` sees everything, `(false, Some(t))` sees one
//! tenant, `(false, None)` sees nothing (denied scope fails closed).
//! The SQL fragment is:
//!
//! ```sql
//! CASE WHEN $n THEN TRUE
//!      WHEN $m::BIGINT IS NULL THEN FALSE
//!      ELSE tenant_id = $m END
//! ```

mod customer_repository;
mod invoice_repository;
mod payment_repository;
mod service_repository;
mod ticket_repository;

pub use customer_repository::PostgresCustomerRepository;
pub use invoice_repository::PostgresInvoiceRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use service_repository::PostgresServiceRepository;
pub use ticket_repository::PostgresTicketRepository;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::tenancy::TenantScope;

/// Binds for the uniform scope predicate.
pub(crate) fn scope_binds(scope: &TenantScope) -> (bool, Option<i64>) {
    match scope {
        TenantScope::Unrestricted => (true, None),
        TenantScope::Tenant(tenant) => (false, Some(tenant.as_i64())),
        TenantScope::Denied => (false, None),
    }
}

/// Maps a sqlx failure into the domain error shape.
pub(crate) fn storage_error(err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TenantId;

    #[test]
    fn scope_binds_cover_all_variants() {
        assert_eq!(scope_binds(&TenantScope::Unrestricted), (true, None));
        assert_eq!(
            scope_binds(&TenantScope::Tenant(TenantId::new(7).unwrap())),
            (false, Some(7))
        );
        assert_eq!(scope_binds(&TenantScope::Denied), (false, None));
    }
}
