//! OpenTicketHandler - opens a support ticket for a customer.
//!
//! Tickets inherit their tenant from the owning customer via an explicit
//! `resolve_owner_tenant` call before the first write, even when the
//! caller omits it.

use std::sync::Arc;

use crate::domain::billing::{NewTicket, Ticket};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::domain::tenancy::{resolve_owner_tenant, Principal, TenantScope};
use crate::ports::{CustomerRepository, TicketRepository};

/// Command to open a ticket.
#[derive(Debug, Clone)]
pub struct OpenTicketCommand {
    pub customer_id: CustomerId,
    pub subject: String,
    pub body: String,
    pub principal: Principal,
}

/// Handler for ticket creation.
pub struct OpenTicketHandler {
    customers: Arc<dyn CustomerRepository>,
    tickets: Arc<dyn TicketRepository>,
}

impl OpenTicketHandler {
    pub fn new(customers: Arc<dyn CustomerRepository>, tickets: Arc<dyn TicketRepository>) -> Self {
        Self { customers, tickets }
    }

    pub async fn handle(&self, cmd: OpenTicketCommand) -> Result<Ticket, DomainError> {
        let scope = TenantScope::for_principal(&cmd.principal);

        let customer = self
            .customers
            .find_by_id(&scope, cmd.customer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::CustomerNotFound,
                    format!("Customer {} not found", cmd.customer_id),
                )
            })?;

        let customer_tenant = customer.tenant;
        let tenant = resolve_owner_tenant(None, || async move { Some(customer_tenant) }).await;

        let new = NewTicket::new(customer.id, cmd.subject, cmd.body, tenant)?;
        let ticket = self.tickets.insert(new).await?;

        tracing::info!(ticket_id = %ticket.id, customer_id = %customer.id, "Opened ticket");
        Ok(ticket)
    }
}
