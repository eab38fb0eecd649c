//! CreateServiceHandler - subscribes a customer to a package.
//!
//! Ownership walks the parent chain: the service inherits its tenant from
//! the owning customer via an explicit `resolve_owner_tenant` call before
//! the first write.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::billing::{NewService, Service};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, PackageId, RouterId, Timestamp};
use crate::domain::tenancy::{resolve_owner_tenant, Principal, TenantScope};
use crate::ports::{CustomerRepository, ServiceRepository};

/// Command to create a service.
#[derive(Debug, Clone)]
pub struct CreateServiceCommand {
    pub customer_id: CustomerId,
    pub package_id: PackageId,
    pub router_id: RouterId,
    /// Captured from the package at subscription time.
    pub monthly_fee: Decimal,
    pub principal: Principal,
}

/// Handler for service creation.
pub struct CreateServiceHandler {
    customers: Arc<dyn CustomerRepository>,
    services: Arc<dyn ServiceRepository>,
}

impl CreateServiceHandler {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        services: Arc<dyn ServiceRepository>,
    ) -> Self {
        Self {
            customers,
            services,
        }
    }

    pub async fn handle(&self, cmd: CreateServiceCommand) -> Result<Service, DomainError> {
        let scope = TenantScope::for_principal(&cmd.principal);

        // The scoped load doubles as the mandatory-parent check: a
        // customer outside the caller's tenant is simply not found.
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

        let new = NewService::new(
            customer.id,
            cmd.package_id,
            cmd.router_id,
            cmd.monthly_fee,
            tenant,
            Timestamp::now(),
        )?;
        let service = self.services.insert(new).await?;

        tracing::info!(
            service_id = %service.id,
            customer_id = %customer.id,
            "Created service"
        );
        Ok(service)
    }
}
