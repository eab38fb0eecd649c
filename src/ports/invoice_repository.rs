//! Invoice repository port.

use async_trait::async_trait;

use crate::domain::billing::{Invoice, NewInvoice};
use crate::domain::foundation::{DomainError, InvoiceId, ServiceId, Timestamp};
use crate::domain::tenancy::TenantScope;

/// Port for invoice persistence.
///
/// Every read takes a [`TenantScope`]; rows outside the scope are
/// indistinguishable from rows that do not exist.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Stores a new invoice and returns it with its assigned id.
    async fn insert(&self, new: NewInvoice) -> Result<Invoice, DomainError>;

    /// Persists status/paid_at/payment-link changes.
    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError>;

    /// Scoped lookup by id.
    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, DomainError>;

    /// Scoped listing of a service's invoices, newest first.
    async fn list_for_service(
        &self,
        scope: &TenantScope,
        service_id: ServiceId,
    ) -> Result<Vec<Invoice>, DomainError>;

    /// Unpaid invoices whose due_date is strictly before the cutoff.
    /// Used by the overdue sweep.
    async fn list_unpaid_due_before(
        &self,
        scope: &TenantScope,
        cutoff: &Timestamp,
    ) -> Result<Vec<Invoice>, DomainError>;

    /// All invoices currently flagged overdue.
    async fn list_overdue(&self, scope: &TenantScope) -> Result<Vec<Invoice>, DomainError>;
}
