//! Ticket repository port.

use async_trait::async_trait;

use crate::domain::billing::{NewTicket, Ticket};
use crate::domain::foundation::{CustomerId, DomainError, TicketId};
use crate::domain::tenancy::TenantScope;

/// Port for support-ticket persistence.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Stores a new ticket and returns it with its assigned id.
    async fn insert(&self, new: NewTicket) -> Result<Ticket, DomainError>;

    /// Persists status and assignment changes.
    async fn update(&self, ticket: &Ticket) -> Result<(), DomainError>;

    /// Scoped lookup by id.
    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: TicketId,
    ) -> Result<Option<Ticket>, DomainError>;

    /// Scoped listing of a customer's tickets.
    async fn list_for_customer(
        &self,
        scope: &TenantScope,
        customer_id: CustomerId,
    ) -> Result<Vec<Ticket>, DomainError>;
}
