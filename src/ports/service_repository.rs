//! Service repository port.

use async_trait::async_trait;

use crate::domain::billing::{NewService, Service};
use crate::domain::foundation::{CustomerId, DomainError, ServiceId, Timestamp};
use crate::domain::tenancy::TenantScope;

/// Port for service persistence.
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Stores a new service and returns it with its assigned id.
    async fn insert(&self, new: NewService) -> Result<Service, DomainError>;

    /// Persists status and billing-anchor changes.
    async fn update(&self, service: &Service) -> Result<(), DomainError>;

    /// Scoped lookup by id.
    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: ServiceId,
    ) -> Result<Option<Service>, DomainError>;

    /// Scoped listing of a customer's services.
    async fn list_for_customer(
        &self,
        scope: &TenantScope,
        customer_id: CustomerId,
    ) -> Result<Vec<Service>, DomainError>;

    /// Active services whose next_invoice_date is at or before `now`.
    /// Used by invoice generation.
    async fn list_billable(
        &self,
        scope: &TenantScope,
        now: &Timestamp,
    ) -> Result<Vec<Service>, DomainError>;
}
