//! ProcessWebhookHandler - the webhook ingress state machine.
//!
//! Receive -> Authenticate -> Normalize -> Dispatch, with each rejection
//! class mapped to a distinct outcome so the HTTP layer can answer with
//! the right status family:
//!
//! - unknown gateway: rejected before any adapter is touched
//! - bad signature: rejected and discarded, never persisted, logged with
//!   caller ip and a truncated reference
//! - malformed payload: rejected as retryable; the provider redelivers
//! - unresolvable reference: acknowledged and logged for manual
//!   reconciliation; redelivery cannot fix a data mismatch
//! - duplicate delivery: acknowledged exactly like a first delivery

use std::sync::Arc;

use thiserror::Error;

use crate::domain::billing::{PaymentStatus, ReconcileError, ReconcileOutcome, ReconciliationEngine};
use crate::domain::foundation::DomainError;
use crate::ports::{GatewayKind, GatewayRegistry, WebhookRequest};

/// Command carrying one raw inbound callback.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Route-supplied gateway identifier, not yet validated.
    pub gateway: String,

    /// Raw request as received.
    pub request: WebhookRequest,
}

/// Outcomes acknowledged with a 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessWebhookResult {
    /// The event changed state.
    Applied {
        transaction_id: String,
        status: PaymentStatus,
        invoice_settled: bool,
    },

    /// Duplicate delivery; nothing changed.
    Duplicate,

    /// Event acknowledged but parked for manual reconciliation; its
    /// reference does not match any invoice.
    Unresolvable,
}

/// Rejection classes surfaced to the HTTP layer.
#[derive(Debug, Error)]
pub enum ProcessWebhookError {
    /// Identifier outside the closed provider set, or a provider with no
    /// credentials configured. Never dispatched to any adapter.
    #[error("unknown payment gateway '{0}'")]
    UnknownGateway(String),

    /// Signature or token verification failed. The payload is discarded.
    #[error("webhook signature verification failed")]
    InvalidSignature,

    /// Body could not be normalized; safe for the provider to retry.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Persistence failure; safe for the provider to retry.
    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// Handler wiring the gateway registry to the reconciliation engine.
pub struct ProcessWebhookHandler {
    gateways: Arc<GatewayRegistry>,
    reconciliation: Arc<ReconciliationEngine>,
}

impl ProcessWebhookHandler {
    pub fn new(gateways: Arc<GatewayRegistry>, reconciliation: Arc<ReconciliationEngine>) -> Self {
        Self {
            gateways,
            reconciliation,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, ProcessWebhookError> {
        // 1. Receive: resolve the adapter from the closed identifier set.
        let kind: GatewayKind = cmd
            .gateway
            .parse()
            .map_err(|_| ProcessWebhookError::UnknownGateway(cmd.gateway.clone()))?;
        let adapter = self
            .gateways
            .get(kind)
            .ok_or_else(|| ProcessWebhookError::UnknownGateway(cmd.gateway.clone()))?;

        // 2. Authenticate. A rejected payload never reaches domain state.
        if !adapter.verify_webhook_signature(&cmd.request) {
            // Best-effort reference extraction for the audit trail only;
            // the payload itself is discarded.
            let reference = adapter
                .parse_webhook_data(&cmd.request)
                .map(|event| event.reference.redacted())
                .unwrap_or_else(|_| "unparsed".to_string());
            tracing::warn!(
                gateway = %kind,
                remote_addr = cmd.request.remote_addr().unwrap_or("unknown"),
                reference = %reference,
                "Rejected webhook with invalid signature"
            );
            return Err(ProcessWebhookError::InvalidSignature);
        }

        // 3. Normalize.
        let event = adapter.parse_webhook_data(&cmd.request).map_err(|e| {
            tracing::warn!(gateway = %kind, error = %e, "Failed to normalize webhook payload");
            ProcessWebhookError::MalformedPayload(e.to_string())
        })?;

        // 4. Dispatch to the reconciliation engine.
        match self.reconciliation.apply(kind, &event).await {
            Ok(ReconcileOutcome::Applied {
                transaction_id,
                status,
                invoice_settled,
            }) => Ok(ProcessWebhookResult::Applied {
                transaction_id,
                status,
                invoice_settled,
            }),
            Ok(ReconcileOutcome::Duplicate) => Ok(ProcessWebhookResult::Duplicate),
            Err(ReconcileError::UnresolvableReference { reference }) => {
                tracing::error!(
                    gateway = %kind,
                    reference = %reference,
                    transaction_id = %event.transaction_id,
                    "Webhook references an unknown invoice; manual reconciliation required"
                );
                Ok(ProcessWebhookResult::Unresolvable)
            }
            Err(ReconcileError::Storage(err)) => Err(ProcessWebhookError::Storage(err)),
        }
    }
}
