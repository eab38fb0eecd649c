//! RegisterCustomerHandler - creates a subscriber account.
//!
//! The customer is the root of the ownership chain: its tenant comes
//! directly from the acting principal, not from a parent entity.

use std::sync::Arc;

use crate::domain::billing::{Customer, NewCustomer};
use crate::domain::foundation::DomainError;
use crate::domain::tenancy::Principal;
use crate::ports::CustomerRepository;

/// Command to register a customer.
#[derive(Debug, Clone)]
pub struct RegisterCustomerCommand {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub principal: Principal,
}

/// Handler for customer registration.
pub struct RegisterCustomerHandler {
    customers: Arc<dyn CustomerRepository>,
}

impl RegisterCustomerHandler {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    pub async fn handle(&self, cmd: RegisterCustomerCommand) -> Result<Customer, DomainError> {
        // Ownership is fixed here, once; it never changes afterwards.
        // Platform-level principals create unowned (global) customers.
        let tenant = cmd.principal.tenant;

        let new = NewCustomer::new(cmd.name, cmd.email, cmd.phone, tenant)?;
        let customer = self.customers.insert(new).await?;

        tracing::info!(customer_id = %customer.id, "Registered customer");
        Ok(customer)
    }
}
