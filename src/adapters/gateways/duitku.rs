//! Duitku gateway adapter (payment inquiry API).
//!
//! Implements the `PaymentGateway` port against the Duitku merchant
//! endpoints. Unlike the JSON providers, Duitku delivers callbacks as
//! `application/x-www-form-urlencoded` fields.
//!
//! # Security
//!
//! Callback authenticity: `signature` field = hex
//! HMAC-SHA256(merchant_code + amount + merchant_order_id) keyed with the
//! API key, compared in constant time against our own computation over
//! the exact form values. The API key is held as
//! `secrecy::SecretString`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::billing::{Invoice, MerchantReference, PaymentStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    GatewayError, GatewayKind, NormalizedPaymentEvent, PaymentGateway, PaymentLink, WebhookRequest,
};

/// Outbound call timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Duitku adapter configuration.
#[derive(Clone)]
pub struct DuitkuGatewayConfig {
    /// Merchant code assigned by Duitku.
    merchant_code: String,

    /// API key used in request and callback signatures.
    api_key: SecretString,

    /// API base URL.
    base_url: String,
}

impl DuitkuGatewayConfig {
    /// Creates a configuration for the production or sandbox environment.
    pub fn new(merchant_code: impl Into<String>, api_key: impl Into<String>, sandbox: bool) -> Self {
        let base = if sandbox {
            "https://sandbox.duitku.com/webapi"
        } else {
            "https://passport.duitku.com/webapi"
        };
        Self {
            merchant_code: merchant_code.into(),
            api_key: SecretString::new(api_key.into()),
            base_url: base.to_string(),
        }
    }

    /// Overrides the base URL (for tests against a local stub).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Duitku gateway adapter.
pub struct DuitkuGateway {
    config: DuitkuGatewayConfig,
    http_client: reqwest::Client,
}

impl DuitkuGateway {
    pub fn new(config: DuitkuGatewayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn mac(&self) -> Hmac<Sha256> {
        Hmac::<Sha256>::new_from_slice(self.config.api_key.expose_secret().as_bytes())
            .expect("HMAC accepts any key size")
    }

    /// Callback signature over the exact form values:
    /// HMAC-SHA256(merchant_code + amount + merchant_order_id).
    fn callback_signature(&self, amount: &str, merchant_order_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(self.config.merchant_code.as_bytes());
        mac.update(amount.as_bytes());
        mac.update(merchant_order_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Request signature for inquiry and status calls:
    /// HMAC-SHA256(merchant_code + merchant_order_id).
    fn request_signature(&self, merchant_order_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(self.config.merchant_code.as_bytes());
        mac.update(merchant_order_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Maps a Duitku result/status code into the canonical vocabulary.
    fn map_status(code: &str) -> PaymentStatus {
        match code {
            "00" => PaymentStatus::Success,
            "01" => PaymentStatus::Pending,
            "02" => PaymentStatus::Failed,
            "03" => PaymentStatus::Expired,
            // Unrecognized provider codes must never settle or fail an
            // invoice on their own.
            _ => PaymentStatus::Pending,
        }
    }

    fn decode_form(body: &[u8]) -> Result<HashMap<String, String>, GatewayError> {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))
    }
}

/// Payment inquiry response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DuitkuInquiryResponse {
    payment_url: String,
    status_code: String,
    status_message: String,
}

/// Transaction status response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DuitkuStatusResponse {
    status_code: String,
}

#[async_trait]
impl PaymentGateway for DuitkuGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Duitku
    }

    async fn create_payment_link(&self, invoice: &Invoice) -> Result<PaymentLink, GatewayError> {
        let reference = MerchantReference::generate(invoice.id, &Timestamp::now());
        let url = format!("{}/api/merchant/v2/inquiry", self.config.base_url);

        let body = serde_json::json!({
            "merchantCode": self.config.merchant_code,
            "merchantOrderId": reference.as_str(),
            "paymentAmount": invoice.amount,
            "productDetails": format!("Invoice {}", invoice.id),
            "signature": self.request_signature(reference.as_str()),
        });

        let response = self
            .http_client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Duitku inquiry failed");
            return Err(GatewayError::Provider {
                code: Some(status.as_u16().to_string()),
                message: error_text,
            });
        }

        let parsed: DuitkuInquiryResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if parsed.status_code != "00" {
            return Err(GatewayError::Provider {
                code: Some(parsed.status_code),
                message: parsed.status_message,
            });
        }

        Ok(PaymentLink {
            url: parsed.payment_url,
            reference,
        })
    }

    fn verify_webhook_signature(&self, request: &WebhookRequest) -> bool {
        let Ok(fields) = Self::decode_form(request.body()) else {
            return false;
        };
        let (Some(amount), Some(order_id), Some(provided)) = (
            fields.get("amount"),
            fields.get("merchantOrderId"),
            fields.get("signature"),
        ) else {
            return false;
        };

        let expected = self.callback_signature(amount, order_id);
        let provided = provided.to_ascii_lowercase();

        if expected.len() != provided.len() {
            return false;
        }
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    fn parse_webhook_data(
        &self,
        request: &WebhookRequest,
    ) -> Result<NormalizedPaymentEvent, GatewayError> {
        let fields = Self::decode_form(request.body())?;

        let order_id = fields
            .get("merchantOrderId")
            .ok_or_else(|| GatewayError::MalformedPayload("missing merchantOrderId".to_string()))?;
        let reference: MerchantReference = order_id
            .parse()
            .map_err(|_| GatewayError::MalformedPayload("empty merchantOrderId".to_string()))?;

        let amount_raw = fields
            .get("amount")
            .ok_or_else(|| GatewayError::MalformedPayload("missing amount".to_string()))?;
        let amount: rust_decimal::Decimal = amount_raw.parse().map_err(|_| {
            GatewayError::MalformedPayload(format!("unparseable amount '{}'", amount_raw))
        })?;

        let result_code = fields
            .get("resultCode")
            .ok_or_else(|| GatewayError::MalformedPayload("missing resultCode".to_string()))?;

        // Duitku assigns its own reference per transaction; fall back to
        // the order id when the field is absent (sandbox omits it for
        // some channels).
        let transaction_id = fields
            .get("reference")
            .unwrap_or(order_id)
            .clone();

        let mut metadata = HashMap::new();
        metadata.insert("resultCode".to_string(), result_code.clone());
        if let Some(publisher_order_id) = fields.get("publisherOrderId") {
            metadata.insert("publisherOrderId".to_string(), publisher_order_id.clone());
        }

        Ok(NormalizedPaymentEvent {
            transaction_id,
            reference,
            status: Self::map_status(result_code),
            amount,
            // Callbacks carry no settlement timestamp; reconciliation
            // falls back to the processing time.
            paid_at: None,
            metadata,
        })
    }

    async fn get_payment_status(
        &self,
        transaction_id: &str,
    ) -> Result<PaymentStatus, GatewayError> {
        let url = format!("{}/api/merchant/transactionStatus", self.config.base_url);

        let body = serde_json::json!({
            "merchantCode": self.config.merchant_code,
            "merchantOrderId": transaction_id,
            "signature": self.request_signature(transaction_id),
        });

        let response = self
            .http_client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
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

        let parsed: DuitkuStatusResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(Self::map_status(&parsed.status_code))
    }
}
