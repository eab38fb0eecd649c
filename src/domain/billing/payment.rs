//! Payment attempt aggregate.
//!
//! A payment row tracks one gateway transaction against one invoice. The
//! external transaction id is unique across the whole system; exactly one
//! terminal transition (Success, Failed, or Expired) is accepted per
//! transaction id, and replays of a terminal transaction are no-ops at the
//! reconciliation layer.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, InvoiceId, PaymentId, StateMachine, TenantId, Timestamp, ValidationError,
};

/// Canonical payment status.
///
/// This is the only status vocabulary the reconciliation engine
/// understands; gateway adapters are solely responsible for mapping
/// provider vocabularies into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting provider settlement.
    Pending,

    /// Captured/settled by the provider.
    Success,

    /// Denied, cancelled, or refused by the provider.
    Failed,

    /// Checkout window elapsed without payment.
    Expired,
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!((self, target), (Pending, Success) | (Pending, Failed) | (Pending, Expired))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Success, Failed, Expired],
            Success | Failed | Expired => vec![],
        }
    }
}

/// One gateway transaction against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    /// Route identifier of the gateway that produced this transaction.
    pub gateway: String,
    /// Provider-assigned transaction id, globally unique.
    pub transaction_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    /// Opaque provider payload fields, kept for manual reconciliation.
    /// Never interpreted by the core.
    pub metadata: HashMap<String, String>,
    /// Owner, inherited from the invoice at creation.
    pub tenant: Option<TenantId>,
    pub created_at: Timestamp,
}

impl Payment {
    /// Creates a pending payment bound to an invoice.
    pub fn pending(
        invoice_id: InvoiceId,
        gateway: impl Into<String>,
        transaction_id: impl Into<String>,
        amount: Decimal,
        metadata: HashMap<String, String>,
        tenant: Option<TenantId>,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let transaction_id = transaction_id.into();
        if transaction_id.trim().is_empty() {
            return Err(ValidationError::empty_field("transaction_id"));
        }
        Ok(Self {
            id: PaymentId::new(),
            invoice_id,
            gateway: gateway.into(),
            transaction_id,
            amount,
            status: PaymentStatus::Pending,
            metadata,
            tenant,
            created_at,
        })
    }

    /// True once the payment reached Success, Failed, or Expired.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies a status transition, validating against the transition
    /// table. Transitioning to the current status is a no-op.
    pub fn apply_status(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        if self.status == target {
            return Ok(());
        }
        self.status = self.status.transition_to(target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        Payment::pending(
            InvoiceId::from_i64(42),
            "midtrans",
            "tx-1",
            dec!(150000.00),
            HashMap::new(),
            None,
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn terminal_statuses_accept_no_transitions() {
        assert!(PaymentStatus::Success.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }

    #[test]
    fn pending_transitions_to_any_terminal() {
        let mut p = payment();
        p.apply_status(PaymentStatus::Success).unwrap();
        assert_eq!(p.status, PaymentStatus::Success);
    }

    #[test]
    fn same_status_is_a_no_op() {
        let mut p = payment();
        p.apply_status(PaymentStatus::Pending).unwrap();
        assert_eq!(p.status, PaymentStatus::Pending);
    }

    #[test]
    fn terminal_to_terminal_is_rejected() {
        let mut p = payment();
        p.apply_status(PaymentStatus::Failed).unwrap();
        assert!(p.apply_status(PaymentStatus::Success).is_err());
        assert_eq!(p.status, PaymentStatus::Failed);
    }

    #[test]
    fn empty_transaction_id_rejected() {
        let result = Payment::pending(
            InvoiceId::from_i64(42),
            "midtrans",
            "  ",
            dec!(10.00),
            HashMap::new(),
            None,
            Timestamp::now(),
        );
        assert!(result.is_err());
    }
}
