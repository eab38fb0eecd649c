//! Customer repository port.

use async_trait::async_trait;

use crate::domain::billing::{Customer, NewCustomer};
use crate::domain::foundation::{CustomerId, DomainError};
use crate::domain::tenancy::TenantScope;

/// Port for customer persistence.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Stores a new customer and returns it with its assigned id.
    async fn insert(&self, new: NewCustomer) -> Result<Customer, DomainError>;

    /// Persists status changes.
    async fn update(&self, customer: &Customer) -> Result<(), DomainError>;

    /// Scoped lookup by id.
    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: CustomerId,
    ) -> Result<Option<Customer>, DomainError>;

    /// Scoped listing, newest first.
    async fn list(&self, scope: &TenantScope) -> Result<Vec<Customer>, DomainError>;
}
