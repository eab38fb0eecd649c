//! Xendit gateway adapter (Invoice API).
//!
//! Implements the `PaymentGateway` port against the Xendit invoice
//! endpoints.
//!
//! # Security
//!
//! Xendit callbacks carry a static `x-callback-token` header issued once
//! in the dashboard, not a per-request signature. That is the provider's
//! actual capability; the comparison is still constant-time and
//! non-throwing. The token and API key are held as
//! `secrecy::SecretString`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::domain::billing::{Invoice, MerchantReference, PaymentStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    GatewayError, GatewayKind, NormalizedPaymentEvent, PaymentGateway, PaymentLink, WebhookRequest,
};

/// Outbound call timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Header carrying the static verification token.
const CALLBACK_TOKEN_HEADER: &str = "x-callback-token";

/// Xendit adapter configuration.
#[derive(Clone)]
pub struct XenditGatewayConfig {
    /// Secret API key (xnd_...).
    secret_key: SecretString,

    /// Static callback verification token from the dashboard.
    callback_token: SecretString,

    /// API base URL.
    base_url: String,
}

impl XenditGatewayConfig {
    pub fn new(secret_key: impl Into<String>, callback_token: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            callback_token: SecretString::new(callback_token.into()),
            base_url: "https://api.xendit.co".to_string(),
        }
    }

    /// Overrides the base URL (for tests against a local stub).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Xendit gateway adapter.
pub struct XenditGateway {
    config: XenditGatewayConfig,
    http_client: reqwest::Client,
}

impl XenditGateway {
    pub fn new(config: XenditGatewayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Maps the Xendit invoice status into the canonical vocabulary.
    fn map_status(status: &str) -> PaymentStatus {
        match status {
            "PAID" | "SETTLED" => PaymentStatus::Success,
            "EXPIRED" => PaymentStatus::Expired,
            // PENDING and anything unrecognized stay Pending.
            _ => PaymentStatus::Pending,
        }
    }
}

/// Invoice creation / status response.
#[derive(Debug, Deserialize)]
struct XenditInvoiceResponse {
    invoice_url: Option<String>,
    status: String,
}

/// Invoice callback payload.
#[derive(Debug, Deserialize)]
struct XenditCallback {
    id: String,
    external_id: String,
    status: String,
    amount: Decimal,
    #[serde(default)]
    paid_amount: Option<Decimal>,
    #[serde(default)]
    paid_at: Option<String>,
    #[serde(default)]
    payment_method: Option<String>,
}

#[async_trait]
impl PaymentGateway for XenditGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Xendit
    }

    async fn create_payment_link(&self, invoice: &Invoice) -> Result<PaymentLink, GatewayError> {
        let reference = MerchantReference::generate(invoice.id, &Timestamp::now());
        let url = format!("{}/v2/invoices", self.config.base_url);

        let body = serde_json::json!({
            "external_id": reference.as_str(),
            "amount": invoice.amount,
            "description": format!("Invoice {}", invoice.id),
        });

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Xendit invoice creation failed");
            return Err(GatewayError::Provider {
                code: Some(status.as_u16().to_string()),
                message: error_text,
            });
        }

        let parsed: XenditInvoiceResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let checkout_url = parsed.invoice_url.ok_or_else(|| {
            GatewayError::InvalidResponse("invoice response missing invoice_url".to_string())
        })?;

        Ok(PaymentLink {
            url: checkout_url,
            reference,
        })
    }

    fn verify_webhook_signature(&self, request: &WebhookRequest) -> bool {
        let Some(provided) = request.header(CALLBACK_TOKEN_HEADER) else {
            return false;
        };
        let expected = self.config.callback_token.expose_secret();

        if expected.len() != provided.len() {
            return false;
        }
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    fn parse_webhook_data(
        &self,
        request: &WebhookRequest,
    ) -> Result<NormalizedPaymentEvent, GatewayError> {
        let callback: XenditCallback = serde_json::from_slice(request.body())
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let reference: MerchantReference = callback
            .external_id
            .parse()
            .map_err(|_| GatewayError::MalformedPayload("empty external_id".to_string()))?;

        let paid_at = callback
            .paid_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| Timestamp::from_datetime(dt.into()));

        let mut metadata = HashMap::new();
        metadata.insert("status".to_string(), callback.status.clone());
        if let Some(method) = &callback.payment_method {
            metadata.insert("payment_method".to_string(), method.clone());
        }

        Ok(NormalizedPaymentEvent {
            transaction_id: callback.id,
            reference,
            status: Self::map_status(&callback.status),
            amount: callback.paid_amount.unwrap_or(callback.amount),
            paid_at,
            metadata,
        })
    }

    async fn get_payment_status(
        &self,
        transaction_id: &str,
    ) -> Result<PaymentStatus, GatewayError> {
        let url = format!("{}/v2/invoices/{}", self.config.base_url, transaction_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider {
                code: Some(status.as_u16().to_string()),
                message: error_text,
            });
        }

        let parsed: XenditInvoiceResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(Self::map_status(&parsed.status))
    }
}
