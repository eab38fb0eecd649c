//! Reconciliation engine - applies normalized payment events exactly once.
//!
//! Inputs come from webhook ingress or status polling, already translated
//! into the canonical vocabulary. The engine owns the only code path that
//! settles invoices.
//!
//! ## Idempotence
//!
//! Applying the same event (same transaction id) any number of times ends
//! in the same Payment and Invoice state as applying it once:
//! - a payment already in a terminal status ignores every further event
//!   for its transaction id;
//! - invoice settlement checks `is_paid()` independently, so a replay
//!   that slipped past the payment check still cannot settle twice.
//!
//! ## Race handling
//!
//! Concurrent deliveries for one transaction id race on the repository's
//! unique transaction-id constraint. The loser receives
//! [`SaveResult::AlreadyExists`], refetches the winner's row, and
//! continues down the update path — never a duplicate row, never an
//! error surfaced to the provider.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{DomainError, InvoiceId, Timestamp};
use crate::domain::tenancy::TenantScope;
use crate::ports::{
    GatewayKind, InvoiceRepository, NormalizedPaymentEvent, PaymentRepository, SaveResult,
};

use super::{Invoice, Payment, PaymentStatus};

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event changed payment (and possibly invoice) state.
    Applied {
        transaction_id: String,
        status: PaymentStatus,
        invoice_settled: bool,
    },

    /// Duplicate delivery of an already-terminal transaction; nothing
    /// changed.
    Duplicate,
}

/// Errors from event application.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The event references an invoice this system does not have. A data
    /// problem, not a transient one: logged and acknowledged, never
    /// retried.
    #[error("cannot resolve invoice from reference '{reference}'")]
    UnresolvableReference { reference: String },

    /// Persistence failure; the caller may let the provider retry.
    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// Applies normalized payment events to Payment and Invoice records.
pub struct ReconciliationEngine {
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
}

impl ReconciliationEngine {
    pub fn new(payments: Arc<dyn PaymentRepository>, invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { payments, invoices }
    }

    /// Applies one event, idempotently.
    ///
    /// `gateway` records which adapter produced the event on newly
    /// created payment rows.
    pub async fn apply(
        &self,
        gateway: GatewayKind,
        event: &NormalizedPaymentEvent,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut payment = match self
            .payments
            .find_by_transaction_id(&event.transaction_id)
            .await?
        {
            Some(payment) => payment,
            None => self.create_pending_payment(gateway, event).await?,
        };

        if payment.is_terminal() {
            tracing::debug!(
                transaction_id = %event.transaction_id,
                status = ?payment.status,
                "Duplicate delivery for terminal payment ignored"
            );
            return Ok(ReconcileOutcome::Duplicate);
        }

        if payment.status != event.status {
            payment.apply_status(event.status)?;
            self.payments.update(&payment).await?;
        }

        let mut invoice_settled = false;
        if event.status == PaymentStatus::Success {
            invoice_settled = self
                .settle_invoice(payment.invoice_id, event.paid_at)
                .await?;
        }

        Ok(ReconcileOutcome::Applied {
            transaction_id: event.transaction_id.clone(),
            status: event.status,
            invoice_settled,
        })
    }

    /// Creates the payment row for a first-seen transaction id.
    ///
    /// Losing the insert race against a concurrent delivery is handled by
    /// refetching the row the winner created.
    async fn create_pending_payment(
        &self,
        gateway: GatewayKind,
        event: &NormalizedPaymentEvent,
    ) -> Result<Payment, ReconcileError> {
        let invoice = self.resolve_invoice(event).await?;

        let payment = Payment::pending(
            invoice.id,
            gateway.as_str(),
            event.transaction_id.clone(),
            event.amount,
            event.metadata.clone(),
            invoice.tenant,
            Timestamp::now(),
        )
        .map_err(DomainError::from)?;

        match self.payments.insert(&payment).await? {
            SaveResult::Inserted => Ok(payment),
            SaveResult::AlreadyExists => {
                let existing = self
                    .payments
                    .find_by_transaction_id(&event.transaction_id)
                    .await?;
                existing.ok_or_else(|| {
                    ReconcileError::Storage(DomainError::new(
                        crate::domain::foundation::ErrorCode::DatabaseError,
                        format!(
                            "payment {} reported as existing but not found",
                            event.transaction_id
                        ),
                    ))
                })
            }
        }
    }

    async fn resolve_invoice(
        &self,
        event: &NormalizedPaymentEvent,
    ) -> Result<Invoice, ReconcileError> {
        let invoice_id = event.reference.invoice_id().map_err(|_| {
            ReconcileError::UnresolvableReference {
                reference: event.reference.as_str().to_string(),
            }
        })?;

        // System path: reconciliation must see every tenant's invoices.
        self.invoices
            .find_by_id(&TenantScope::unrestricted(), invoice_id)
            .await?
            .ok_or_else(|| ReconcileError::UnresolvableReference {
                reference: event.reference.as_str().to_string(),
            })
    }

    /// Settles the invoice once. Returns whether this call changed it.
    async fn settle_invoice(
        &self,
        invoice_id: InvoiceId,
        paid_at: Option<Timestamp>,
    ) -> Result<bool, ReconcileError> {
        let Some(mut invoice) = self
            .invoices
            .find_by_id(&TenantScope::unrestricted(), invoice_id)
            .await?
        else {
            return Err(ReconcileError::UnresolvableReference {
                reference: invoice_id.to_string(),
            });
        };

        if invoice.is_paid() {
            return Ok(false);
        }

        invoice.mark_paid(paid_at.unwrap_or_else(Timestamp::now))?;
        self.invoices.update(&invoice).await?;

        tracing::info!(
            invoice_id = %invoice_id,
            "Invoice settled by successful payment"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{InvoiceStatus, NewInvoice};
    use crate::ports::NormalizedPaymentEvent;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    /// In-memory payment repository keyed on the transaction id.
    struct MockPaymentRepository {
        rows: RwLock<HashMap<String, Payment>>,
    }

    impl MockPaymentRepository {
        fn new() -> Self {
            Self {
                rows: RwLock::new(HashMap::new()),
            }
        }

        async fn count(&self) -> usize {
            self.rows.read().await.len()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepository {
        async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError> {
            let mut rows = self.rows.write().await;
            if rows.contains_key(&payment.transaction_id) {
                Ok(SaveResult::AlreadyExists)
            } else {
                rows.insert(payment.transaction_id.clone(), payment.clone());
                Ok(SaveResult::Inserted)
            }
        }

        async fn find_by_transaction_id(
            &self,
            transaction_id: &str,
        ) -> Result<Option<Payment>, DomainError> {
            Ok(self.rows.read().await.get(transaction_id).cloned())
        }

        async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
            self.rows
                .write()
                .await
                .insert(payment.transaction_id.clone(), payment.clone());
            Ok(())
        }

        async fn list_for_invoice(
            &self,
            scope: &TenantScope,
            invoice_id: InvoiceId,
        ) -> Result<Vec<Payment>, DomainError> {
            Ok(self
                .rows
                .read()
                .await
                .values()
                .filter(|p| p.invoice_id == invoice_id && scope.permits(p.tenant))
                .cloned()
                .collect())
        }
    }

    /// In-memory invoice repository.
    struct MockInvoiceRepository {
        rows: RwLock<HashMap<i64, Invoice>>,
    }

    impl MockInvoiceRepository {
        fn new() -> Self {
            Self {
                rows: RwLock::new(HashMap::new()),
            }
        }

        async fn seed(&self, invoice: Invoice) {
            self.rows.write().await.insert(invoice.id.as_i64(), invoice);
        }

        async fn get(&self, id: i64) -> Invoice {
            self.rows.read().await.get(&id).cloned().unwrap()
        }
    }

    #[async_trait]
    impl InvoiceRepository for MockInvoiceRepository {
        async fn insert(&self, new: NewInvoice) -> Result<Invoice, DomainError> {
            let id = self.rows.read().await.len() as i64 + 1;
            let invoice = Invoice::from_parts(InvoiceId::from_i64(id), new);
            self.rows.write().await.insert(id, invoice.clone());
            Ok(invoice)
        }

        async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
            self.rows
                .write()
                .await
                .insert(invoice.id.as_i64(), invoice.clone());
            Ok(())
        }

        async fn find_by_id(
            &self,
            scope: &TenantScope,
            id: InvoiceId,
        ) -> Result<Option<Invoice>, DomainError> {
            Ok(self
                .rows
                .read()
                .await
                .get(&id.as_i64())
                .filter(|i| scope.permits(i.tenant))
                .cloned())
        }

        async fn list_for_service(
            &self,
            _scope: &TenantScope,
            _service_id: crate::domain::foundation::ServiceId,
        ) -> Result<Vec<Invoice>, DomainError> {
            unimplemented!("not exercised by reconciliation tests")
        }

        async fn list_unpaid_due_before(
            &self,
            _scope: &TenantScope,
            _cutoff: &Timestamp,
        ) -> Result<Vec<Invoice>, DomainError> {
            unimplemented!("not exercised by reconciliation tests")
        }

        async fn list_overdue(&self, _scope: &TenantScope) -> Result<Vec<Invoice>, DomainError> {
            unimplemented!("not exercised by reconciliation tests")
        }
    }

    fn unpaid_invoice(id: i64) -> Invoice {
        Invoice::from_parts(
            InvoiceId::from_i64(id),
            NewInvoice::new(
                crate::domain::foundation::ServiceId::from_i64(10),
                dec!(150000.00),
                Timestamp::now(),
                Timestamp::now().add_days(7),
                None,
            )
            .unwrap(),
        )
    }

    fn event(transaction_id: &str, reference: &str, status: PaymentStatus) -> NormalizedPaymentEvent {
        NormalizedPaymentEvent {
            transaction_id: transaction_id.to_string(),
            reference: reference.parse().unwrap(),
            status,
            amount: dec!(150000.00),
            paid_at: None,
            metadata: HashMap::new(),
        }
    }

    struct Fixture {
        engine: ReconciliationEngine,
        payments: Arc<MockPaymentRepository>,
        invoices: Arc<MockInvoiceRepository>,
    }

    async fn fixture_with_invoice(id: i64) -> Fixture {
        let payments = Arc::new(MockPaymentRepository::new());
        let invoices = Arc::new(MockInvoiceRepository::new());
        invoices.seed(unpaid_invoice(id)).await;
        let engine = ReconciliationEngine::new(payments.clone(), invoices.clone());
        Fixture {
            engine,
            payments,
            invoices,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Settlement
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn success_event_settles_invoice_and_creates_payment() {
        let f = fixture_with_invoice(42).await;
        let event = event("tx-1", "INV-42-1736500000000", PaymentStatus::Success);

        let outcome = f.engine.apply(GatewayKind::Midtrans, &event).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                transaction_id: "tx-1".to_string(),
                status: PaymentStatus::Success,
                invoice_settled: true,
            }
        );

        let invoice = f.invoices.get(42).await;
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.paid_at.is_some());

        let payment = f
            .payments
            .find_by_transaction_id("tx-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.gateway, "midtrans");
    }

    #[tokio::test]
    async fn success_event_uses_reported_paid_at() {
        let f = fixture_with_invoice(42).await;
        let paid_at = Timestamp::now().add_days(-1);
        let mut e = event("tx-1", "INV-42", PaymentStatus::Success);
        e.paid_at = Some(paid_at);

        f.engine.apply(GatewayKind::Midtrans, &e).await.unwrap();

        assert_eq!(f.invoices.get(42).await.paid_at, Some(paid_at));
    }

    // ══════════════════════════════════════════════════════════════
    // Idempotence
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn redelivered_success_event_is_a_no_op() {
        let f = fixture_with_invoice(42).await;
        let e = event("tx-1", "INV-42-1736500000000", PaymentStatus::Success);

        f.engine.apply(GatewayKind::Midtrans, &e).await.unwrap();
        let first_paid_at = f.invoices.get(42).await.paid_at;

        let outcome = f.engine.apply(GatewayKind::Midtrans, &e).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Duplicate);
        assert_eq!(f.payments.count().await, 1);
        assert_eq!(f.invoices.get(42).await.paid_at, first_paid_at);
    }

    #[tokio::test]
    async fn terminal_payment_ignores_conflicting_status() {
        let f = fixture_with_invoice(42).await;
        f.engine
            .apply(GatewayKind::Midtrans, &event("tx-1", "INV-42", PaymentStatus::Failed))
            .await
            .unwrap();

        // A late "success" for the same transaction must not resurrect it.
        let outcome = f
            .engine
            .apply(GatewayKind::Midtrans, &event("tx-1", "INV-42", PaymentStatus::Success))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Duplicate);
        let payment = f
            .payments
            .find_by_transaction_id("tx-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(f.invoices.get(42).await.status, InvoiceStatus::Unpaid);
    }

    #[tokio::test]
    async fn pending_then_success_upgrades_in_place() {
        let f = fixture_with_invoice(42).await;

        f.engine
            .apply(GatewayKind::Xendit, &event("tx-1", "INV-42", PaymentStatus::Pending))
            .await
            .unwrap();
        assert_eq!(f.invoices.get(42).await.status, InvoiceStatus::Unpaid);

        f.engine
            .apply(GatewayKind::Xendit, &event("tx-1", "INV-42", PaymentStatus::Success))
            .await
            .unwrap();

        assert_eq!(f.payments.count().await, 1);
        assert_eq!(f.invoices.get(42).await.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn repeated_pending_events_stay_pending() {
        let f = fixture_with_invoice(42).await;
        let e = event("tx-1", "INV-42", PaymentStatus::Pending);

        for _ in 0..3 {
            let outcome = f.engine.apply(GatewayKind::Duitku, &e).await.unwrap();
            assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));
        }

        assert_eq!(f.payments.count().await, 1);
        let payment = f
            .payments
            .find_by_transaction_id("tx-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    // ══════════════════════════════════════════════════════════════
    // Failure paths
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failed_event_leaves_invoice_untouched() {
        let f = fixture_with_invoice(42).await;

        f.engine
            .apply(GatewayKind::Midtrans, &event("tx-1", "INV-42", PaymentStatus::Failed))
            .await
            .unwrap();

        // Another attempt may still settle the invoice later.
        assert_eq!(f.invoices.get(42).await.status, InvoiceStatus::Unpaid);
    }

    #[tokio::test]
    async fn expired_event_leaves_invoice_untouched() {
        let f = fixture_with_invoice(42).await;

        f.engine
            .apply(GatewayKind::Xendit, &event("tx-1", "INV-42", PaymentStatus::Expired))
            .await
            .unwrap();

        assert_eq!(f.invoices.get(42).await.status, InvoiceStatus::Unpaid);
    }

    #[tokio::test]
    async fn second_attempt_can_settle_after_first_expired() {
        let f = fixture_with_invoice(42).await;

        f.engine
            .apply(GatewayKind::Xendit, &event("tx-1", "INV-42", PaymentStatus::Expired))
            .await
            .unwrap();
        f.engine
            .apply(GatewayKind::Xendit, &event("tx-2", "INV-42", PaymentStatus::Success))
            .await
            .unwrap();

        assert_eq!(f.payments.count().await, 2);
        assert_eq!(f.invoices.get(42).await.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn unknown_invoice_is_unresolvable() {
        let f = fixture_with_invoice(42).await;

        let result = f
            .engine
            .apply(GatewayKind::Midtrans, &event("tx-9", "INV-999", PaymentStatus::Success))
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::UnresolvableReference { .. })
        ));
        assert_eq!(f.payments.count().await, 0);
    }

    #[tokio::test]
    async fn garbage_reference_is_unresolvable() {
        let f = fixture_with_invoice(42).await;

        let result = f
            .engine
            .apply(GatewayKind::Midtrans, &event("tx-9", "ORDER-xyz", PaymentStatus::Success))
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::UnresolvableReference { .. })
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Concurrency
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn concurrent_duplicate_deliveries_settle_once() {
        let f = fixture_with_invoice(42).await;
        let engine = Arc::new(f.engine);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let e = event("tx-1", "INV-42", PaymentStatus::Success);
            handles.push(tokio::spawn(async move {
                engine.apply(GatewayKind::Midtrans, &e).await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                ReconcileOutcome::Applied { .. } => applied += 1,
                ReconcileOutcome::Duplicate => {}
            }
        }

        // At least one delivery applies; every row outcome is identical
        // to the single-delivery case.
        assert!(applied >= 1);
        assert_eq!(f.payments.count().await, 1);
        let invoice = f.invoices.get(42).await;
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn bare_numeric_reference_resolves() {
        let f = fixture_with_invoice(42).await;

        let outcome = f
            .engine
            .apply(GatewayKind::Duitku, &event("tx-1", "42", PaymentStatus::Success))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));
        assert_eq!(f.invoices.get(42).await.status, InvoiceStatus::Paid);
    }
}
