//! GetInvoiceHandler - scoped invoice read with its payment attempts.

use std::sync::Arc;

use crate::domain::billing::{Invoice, Payment};
use crate::domain::foundation::{DomainError, ErrorCode, InvoiceId};
use crate::domain::tenancy::{Principal, TenantScope};
use crate::ports::{InvoiceRepository, PaymentRepository};

/// Query for one invoice.
#[derive(Debug, Clone)]
pub struct GetInvoiceQuery {
    pub invoice_id: InvoiceId,
    pub principal: Principal,
}

/// Invoice together with its recorded payment attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceView {
    pub invoice: Invoice,
    pub payments: Vec<Payment>,
}

/// Handler for scoped invoice reads.
pub struct GetInvoiceHandler {
    invoices: Arc<dyn InvoiceRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl GetInvoiceHandler {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { invoices, payments }
    }

    pub async fn handle(&self, query: GetInvoiceQuery) -> Result<InvoiceView, DomainError> {
        let scope = TenantScope::for_principal(&query.principal);

        let invoice = self
            .invoices
            .find_by_id(&scope, query.invoice_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InvoiceNotFound,
                    format!("Invoice {} not found", query.invoice_id),
                )
            })?;

        let payments = self.payments.list_for_invoice(&scope, invoice.id).await?;

        Ok(InvoiceView { invoice, payments })
    }
}
