//! Invoice aggregate and billing state machine.
//!
//! Invariants:
//! - due_date >= invoice_date, enforced at construction
//! - paid_at is set iff status is Paid
//! - nothing leaves Paid; Cancelled is reachable from Unpaid/Overdue only

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, InvoiceId, ServiceId, StateMachine, TenantId, Timestamp,
    ValidationError,
};

/// Billing status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued, awaiting settlement.
    Unpaid,

    /// Settled by a successful payment.
    Paid,

    /// Past due_date without settlement.
    Overdue,

    /// Manually voided by staff.
    Cancelled,
}

impl StateMachine for InvoiceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, target),
            (Unpaid, Paid) | (Unpaid, Overdue) | (Unpaid, Cancelled) | (Overdue, Paid) | (Overdue, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use InvoiceStatus::*;
        match self {
            Unpaid => vec![Paid, Overdue, Cancelled],
            Overdue => vec![Paid, Cancelled],
            Paid => vec![],
            Cancelled => vec![],
        }
    }
}

/// Payload for issuing an invoice; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub service_id: ServiceId,
    pub amount: Decimal,
    pub invoice_date: Timestamp,
    pub due_date: Timestamp,
    /// Owner, inherited from the service before the first write.
    pub tenant: Option<TenantId>,
}

impl NewInvoice {
    /// Validates amount and date ordering.
    pub fn new(
        service_id: ServiceId,
        amount: Decimal,
        invoice_date: Timestamp,
        due_date: Timestamp,
        tenant: Option<TenantId>,
    ) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::invalid_format(
                "amount",
                "must be greater than zero",
            ));
        }
        if due_date.is_before(&invoice_date) {
            return Err(ValidationError::invalid_format(
                "due_date",
                "must not precede invoice_date",
            ));
        }
        Ok(Self {
            service_id,
            amount,
            invoice_date,
            due_date,
            tenant,
        })
    }
}

/// A billing document for one service period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub service_id: ServiceId,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub invoice_date: Timestamp,
    pub due_date: Timestamp,
    /// Set iff status is Paid.
    pub paid_at: Option<Timestamp>,
    /// Checkout URL from the most recent payment-link request.
    pub payment_link_url: Option<String>,
    pub tenant: Option<TenantId>,
}

impl Invoice {
    /// Hydrates an invoice from stored state.
    pub fn from_parts(id: InvoiceId, new: NewInvoice) -> Self {
        Self {
            id,
            service_id: new.service_id,
            amount: new.amount,
            status: InvoiceStatus::Unpaid,
            invoice_date: new.invoice_date,
            due_date: new.due_date,
            paid_at: None,
            payment_link_url: None,
            tenant: new.tenant,
        }
    }

    /// True once a successful payment has settled this invoice.
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Settles the invoice.
    ///
    /// Only the reconciliation engine calls this, on a successful payment
    /// belonging to this invoice.
    pub fn mark_paid(&mut self, paid_at: Timestamp) -> Result<(), DomainError> {
        if self.is_paid() {
            return Err(DomainError::new(
                ErrorCode::InvoiceAlreadyPaid,
                format!("Invoice {} is already paid", self.id),
            ));
        }
        self.status = self.status.transition_to(InvoiceStatus::Paid)?;
        self.paid_at = Some(paid_at);
        Ok(())
    }

    /// Flags the invoice overdue once due_date has passed.
    pub fn mark_overdue(&mut self, now: &Timestamp) -> Result<(), DomainError> {
        if !now.is_after(&self.due_date) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Invoice {} is not yet past due", self.id),
            ));
        }
        self.status = self.status.transition_to(InvoiceStatus::Overdue)?;
        Ok(())
    }

    /// Manually voids the invoice. Valid from Unpaid and Overdue only.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(InvoiceStatus::Cancelled)?;
        Ok(())
    }

    /// Records the checkout URL returned by a gateway.
    pub fn attach_payment_link(&mut self, url: impl Into<String>) {
        self.payment_link_url = Some(url.into());
    }

    /// Whole days this invoice has been past due at `now`; zero or
    /// negative when not yet due.
    pub fn days_overdue(&self, now: &Timestamp) -> i64 {
        now.days_since(&self.due_date)
    }
}
