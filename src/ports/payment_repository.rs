//! Payment repository port.
//!
//! The insert contract is the concurrency boundary for webhook
//! reconciliation: the store must enforce a unique constraint on
//! `transaction_id` and report a concurrent duplicate insert as
//! [`SaveResult::AlreadyExists`] instead of failing, so the engine can
//! fall back to the update path.

use async_trait::async_trait;

use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, InvoiceId};
use crate::domain::tenancy::TenantScope;

/// Result of an insert against the unique transaction-id constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// This call created the row.
    Inserted,

    /// A row with the same transaction id already existed (concurrent
    /// duplicate delivery lost the race).
    AlreadyExists,
}

/// Port for payment persistence.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts a payment, relying on the unique transaction-id
    /// constraint to reject duplicates.
    async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError>;

    /// Looks up a payment by its external transaction id.
    ///
    /// Unscoped by design: reconciliation runs as a system path and the
    /// transaction id is globally unique.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Persists a status transition.
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Payment attempts recorded against an invoice, scoped.
    async fn list_for_invoice(
        &self,
        scope: &TenantScope,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, DomainError>;
}
