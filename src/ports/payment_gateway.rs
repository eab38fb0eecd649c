//! Payment gateway port.
//!
//! One uniform capability contract for every external payment provider.
//! Adapters encapsulate their provider's request/response shapes, signing
//! scheme, and status vocabulary; nothing provider-specific crosses this
//! boundary.
//!
//! # Design
//!
//! - **Closed provider set**: [`GatewayKind`] enumerates every supported
//!   provider; webhook routes reject anything else before dispatch.
//! - **Canonical statuses**: adapters map provider vocabularies into
//!   [`PaymentStatus`]; unrecognized provider states map to `Pending`,
//!   never silently to a settlement.
//! - **Non-throwing verification**: `verify_webhook_signature` returns a
//!   plain `bool` and must swallow every internal failure — a forged or
//!   malformed callback learns nothing from the response.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::billing::{Invoice, MerchantReference, PaymentStatus};
use crate::domain::foundation::Timestamp;

/// Closed set of supported payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Midtrans,
    Xendit,
    Duitku,
}

impl GatewayKind {
    /// Every supported provider, for registry wiring and diagnostics.
    pub const ALL: [GatewayKind; 3] = [GatewayKind::Midtrans, GatewayKind::Xendit, GatewayKind::Duitku];

    /// Route identifier used in webhook paths and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Midtrans => "midtrans",
            GatewayKind::Xendit => "xendit",
            GatewayKind::Duitku => "duitku",
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for route identifiers outside the closed provider set.
#[derive(Debug, Clone, Error)]
#[error("unknown gateway identifier '{0}'")]
pub struct UnknownGateway(pub String);

impl FromStr for GatewayKind {
    type Err = UnknownGateway;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "midtrans" => Ok(GatewayKind::Midtrans),
            "xendit" => Ok(GatewayKind::Xendit),
            "duitku" => Ok(GatewayKind::Duitku),
            other => Err(UnknownGateway(other.to_string())),
        }
    }
}

/// Raw inbound provider callback, captured before any parsing.
///
/// Header names are stored lowercased; bodies are kept as raw bytes
/// because signature schemes operate on the exact wire payload.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    headers: HashMap<String, String>,
    body: Vec<u8>,
    remote_addr: Option<String>,
}

impl WebhookRequest {
    pub fn new(
        headers: HashMap<String, String>,
        body: Vec<u8>,
        remote_addr: Option<String>,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self {
            headers,
            body,
            remote_addr,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Exact wire payload.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Caller address for rejection logging, when known.
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }
}

/// Checkout link returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    /// Fully qualified checkout URL for the subscriber.
    pub url: String,

    /// Merchant reference embedded in the provider order, echoed back in
    /// the eventual callback.
    pub reference: MerchantReference,
}

/// Provider callback translated into the canonical vocabulary.
///
/// This is the only payment event shape the reconciliation engine
/// accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPaymentEvent {
    /// Provider-assigned transaction id, globally unique.
    pub transaction_id: String,

    /// Merchant reference echoed by the provider; resolves to the
    /// invoice.
    pub reference: MerchantReference,

    /// Canonical status after vocabulary mapping.
    pub status: PaymentStatus,

    /// Gross amount reported by the provider.
    pub amount: Decimal,

    /// Settlement time reported by the provider, if any.
    pub paid_at: Option<Timestamp>,

    /// Opaque provider fields kept for manual reconciliation.
    pub metadata: HashMap<String, String>,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Network failure or timeout on an outbound call. The core never
    /// retries automatically; retry policy belongs to the caller.
    #[error("gateway network error: {0}")]
    Network(String),

    /// Provider answered with a business error.
    #[error("provider error: {message}")]
    Provider {
        code: Option<String>,
        message: String,
    },

    /// Provider answered 2xx but the body was not in the documented
    /// shape.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Inbound callback body could not be parsed. Rejected with a
    /// retryable response class so the provider redelivers.
    #[error("malformed callback payload: {0}")]
    MalformedPayload(String),
}

/// Uniform capability contract implemented by every gateway adapter.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which provider this adapter fronts.
    fn kind(&self) -> GatewayKind;

    /// Requests a checkout link for the invoice.
    ///
    /// Generates a merchant reference unique to this attempt (never
    /// reused across retries), signs the request per the provider scheme,
    /// and returns the checkout URL. The adapter persists nothing; the
    /// caller stores the URL on the invoice.
    async fn create_payment_link(&self, invoice: &Invoice) -> Result<PaymentLink, GatewayError>;

    /// Recomputes the provider signature over the raw request and
    /// compares in constant time.
    ///
    /// Returns `false` on any missing field or internal error; never
    /// panics or returns detail that could aid a forger.
    fn verify_webhook_signature(&self, request: &WebhookRequest) -> bool;

    /// Extracts the provider payload and maps it into the canonical
    /// event shape.
    fn parse_webhook_data(
        &self,
        request: &WebhookRequest,
    ) -> Result<NormalizedPaymentEvent, GatewayError>;

    /// Out-of-band status poll for reconciliation-by-pull when no
    /// callback has arrived.
    async fn get_payment_status(&self, transaction_id: &str)
        -> Result<PaymentStatus, GatewayError>;
}
