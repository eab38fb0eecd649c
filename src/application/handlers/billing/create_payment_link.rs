//! CreatePaymentLinkHandler - requests a checkout link for an invoice.
//!
//! The gateway call is side-effect-free from this system's perspective;
//! the handler persists the returned URL on the invoice afterwards.
//! Gateway failures surface typed so the caller can decide whether to
//! retry or alert an operator - the core itself never retries.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, InvoiceId};
use crate::domain::tenancy::{Principal, TenantScope};
use crate::ports::{GatewayError, GatewayKind, GatewayRegistry, InvoiceRepository, PaymentLink};

/// Command to create a payment link.
#[derive(Debug, Clone)]
pub struct CreatePaymentLinkCommand {
    pub invoice_id: InvoiceId,

    /// Explicit provider choice; the configured default applies when
    /// absent.
    pub gateway: Option<GatewayKind>,

    pub principal: Principal,
}

/// Errors from payment-link creation.
#[derive(Debug, Error)]
pub enum CreatePaymentLinkError {
    /// Outbound gateway failure, surfaced typed to the caller.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Scoped lookup or state failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Handler for payment-link creation.
pub struct CreatePaymentLinkHandler {
    invoices: Arc<dyn InvoiceRepository>,
    gateways: Arc<GatewayRegistry>,
}

impl CreatePaymentLinkHandler {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, gateways: Arc<GatewayRegistry>) -> Self {
        Self { invoices, gateways }
    }

    pub async fn handle(
        &self,
        cmd: CreatePaymentLinkCommand,
    ) -> Result<PaymentLink, CreatePaymentLinkError> {
        let scope = TenantScope::for_principal(&cmd.principal);

        // Cross-tenant ids surface as not found.
        let mut invoice = self
            .invoices
            .find_by_id(&scope, cmd.invoice_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InvoiceNotFound,
                    format!("Invoice {} not found", cmd.invoice_id),
                )
            })?;

        if invoice.is_paid() {
            return Err(DomainError::new(
                ErrorCode::InvoiceAlreadyPaid,
                format!("Invoice {} is already paid", invoice.id),
            )
            .into());
        }

        let kind = cmd.gateway.unwrap_or_else(|| self.gateways.default_kind());
        let adapter = self.gateways.get(kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::GatewayNotConfigured,
                format!("Gateway '{}' has no credentials configured", kind),
            )
        })?;

        let link = adapter.create_payment_link(&invoice).await?;

        invoice.attach_payment_link(&link.url);
        self.invoices.update(&invoice).await?;

        tracing::info!(
            invoice_id = %invoice.id,
            gateway = %kind,
            reference = %link.reference.redacted(),
            "Created payment link"
        );
        Ok(link)
    }
}
