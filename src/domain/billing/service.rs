//! Subscribed service aggregate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CustomerId, DomainError, PackageId, RouterId, ServiceId, StateMachine, TenantId, Timestamp,
    ValidationError,
};

/// Lifecycle status of a subscribed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Created, waiting for provisioning on the router.
    Pending,

    /// Provisioned and billing.
    Active,

    /// Bandwidth-restricted for non-payment; restored on settlement.
    Isolated,

    /// Manually suspended by staff.
    Suspended,

    /// Contract ended.
    Terminated,

    /// Router rejected the provisioning request; needs operator action.
    ProvisioningFailed,
}

impl StateMachine for ServiceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ServiceStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Pending, ProvisioningFailed)
                | (Pending, Terminated)
                | (Active, Isolated)
                | (Active, Suspended)
                | (Active, Terminated)
                | (Isolated, Active)
                | (Isolated, Terminated)
                | (Suspended, Active)
                | (Suspended, Terminated)
                | (ProvisioningFailed, Pending)
                | (ProvisioningFailed, Terminated)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ServiceStatus::*;
        match self {
            Pending => vec![Active, ProvisioningFailed, Terminated],
            Active => vec![Isolated, Suspended, Terminated],
            Isolated => vec![Active, Terminated],
            Suspended => vec![Active, Terminated],
            ProvisioningFailed => vec![Pending, Terminated],
            Terminated => vec![],
        }
    }
}

/// Payload for creating a service; the repository assigns the id.
///
/// `tenant` is resolved from the owning customer before the first write;
/// `monthly_fee` is captured from the package at subscription time so
/// later plan-price changes do not rewrite history.
#[derive(Debug, Clone)]
pub struct NewService {
    pub customer_id: CustomerId,
    pub package_id: PackageId,
    pub router_id: RouterId,
    pub monthly_fee: Decimal,
    pub tenant: Option<TenantId>,
    pub next_invoice_date: Timestamp,
}

impl NewService {
    pub fn new(
        customer_id: CustomerId,
        package_id: PackageId,
        router_id: RouterId,
        monthly_fee: Decimal,
        tenant: Option<TenantId>,
        next_invoice_date: Timestamp,
    ) -> Result<Self, ValidationError> {
        if monthly_fee <= Decimal::ZERO {
            return Err(ValidationError::invalid_format(
                "monthly_fee",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            customer_id,
            package_id,
            router_id,
            monthly_fee,
            tenant,
            next_invoice_date,
        })
    }
}

/// A provisioned subscription binding a customer to a package and router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub customer_id: CustomerId,
    pub package_id: PackageId,
    pub router_id: RouterId,
    pub monthly_fee: Decimal,
    pub status: ServiceStatus,
    pub tenant: Option<TenantId>,
    /// Next date the billing cycle should issue an invoice for this
    /// service.
    pub next_invoice_date: Timestamp,
    pub created_at: Timestamp,
}

impl Service {
    /// Hydrates a service from stored state.
    pub fn from_parts(
        id: ServiceId,
        new: NewService,
        status: ServiceStatus,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            customer_id: new.customer_id,
            package_id: new.package_id,
            router_id: new.router_id,
            monthly_fee: new.monthly_fee,
            status,
            tenant: new.tenant,
            next_invoice_date: new.next_invoice_date,
            created_at,
        }
    }

    /// Moves the service to a new lifecycle status, validating the
    /// transition table.
    pub fn set_status(&mut self, target: ServiceStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target)?;
        Ok(())
    }

    /// True when the billing cycle should issue an invoice at `now`.
    pub fn is_billable(&self, now: &Timestamp) -> bool {
        self.status == ServiceStatus::Active && !self.next_invoice_date.is_after(now)
    }

    /// Advances the billing anchor by one calendar month after an invoice
    /// has been issued.
    pub fn advance_billing_anchor(&mut self) {
        self.next_invoice_date = self.next_invoice_date.add_months(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    fn service(status: ServiceStatus, next_invoice: Timestamp) -> Service {
        Service::from_parts(
            ServiceId::from_i64(10),
            NewService::new(
                CustomerId::from_i64(1),
                PackageId::from_i64(2),
                RouterId::from_i64(3),
                dec!(150000.00),
                None,
                next_invoice,
            )
            .unwrap(),
            status,
            at(2025, 1, 1),
        )
    }

    #[test]
    fn isolation_is_reversible() {
        let mut svc = service(ServiceStatus::Active, at(2025, 2, 1));
        svc.set_status(ServiceStatus::Isolated).unwrap();
        svc.set_status(ServiceStatus::Active).unwrap();
        assert_eq!(svc.status, ServiceStatus::Active);
    }

    #[test]
    fn provisioning_failure_can_be_retried() {
        let mut svc = service(ServiceStatus::Pending, at(2025, 2, 1));
        svc.set_status(ServiceStatus::ProvisioningFailed).unwrap();
        svc.set_status(ServiceStatus::Pending).unwrap();
        assert_eq!(svc.status, ServiceStatus::Pending);
    }

    #[test]
    fn only_active_services_are_billable() {
        let now = at(2025, 2, 1);
        assert!(service(ServiceStatus::Active, at(2025, 2, 1)).is_billable(&now));
        assert!(service(ServiceStatus::Active, at(2025, 1, 15)).is_billable(&now));
        assert!(!service(ServiceStatus::Active, at(2025, 2, 2)).is_billable(&now));
        assert!(!service(ServiceStatus::Isolated, at(2025, 1, 15)).is_billable(&now));
        assert!(!service(ServiceStatus::Pending, at(2025, 1, 15)).is_billable(&now));
    }

    #[test]
    fn billing_anchor_advances_by_calendar_month() {
        let mut svc = service(ServiceStatus::Active, at(2025, 1, 31));
        svc.advance_billing_anchor();
        assert_eq!(svc.next_invoice_date, at(2025, 2, 28));
    }

    #[test]
    fn zero_fee_rejected() {
        let result = NewService::new(
            CustomerId::from_i64(1),
            PackageId::from_i64(2),
            RouterId::from_i64(3),
            Decimal::ZERO,
            None,
            at(2025, 1, 1),
        );
        assert!(result.is_err());
    }
}
