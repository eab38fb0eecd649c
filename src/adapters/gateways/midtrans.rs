//! Midtrans gateway adapter (Snap checkout).
//!
//! Implements the `PaymentGateway` port against the Midtrans Snap and
//! status APIs.
//!
//! # Security
//!
//! Callback authenticity: `signature_key` = hex
//! SHA-512(order_id + status_code + gross_amount + server_key), compared
//! in constant time against our own computation over the exact payload
//! strings. The server key is held as `secrecy::SecretString`.
//!
//! # Status vocabulary
//!
//! capture/settlement map to Success unless `fraud_status` overrides;
//! deny/cancel/failure map to Failed; expire maps to Expired; everything
//! unrecognized stays Pending so a new provider state can never fabricate
//! a settlement.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::domain::billing::{Invoice, MerchantReference, PaymentStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    GatewayError, GatewayKind, NormalizedPaymentEvent, PaymentGateway, PaymentLink, WebhookRequest,
};

/// Outbound call timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Midtrans adapter configuration.
#[derive(Clone)]
pub struct MidtransGatewayConfig {
    /// Server key (SB-Mid-server-... in sandbox).
    server_key: SecretString,

    /// Snap checkout base URL.
    app_base_url: String,

    /// Core API base URL (status polling).
    api_base_url: String,
}

impl MidtransGatewayConfig {
    /// Creates a configuration for the production or sandbox environment.
    pub fn new(server_key: impl Into<String>, sandbox: bool) -> Self {
        let (app, api) = if sandbox {
            (
                "https://app.sandbox.midtrans.com",
                "https://api.sandbox.midtrans.com",
            )
        } else {
            ("https://app.midtrans.com", "https://api.midtrans.com")
        };
        Self {
            server_key: SecretString::new(server_key.into()),
            app_base_url: app.to_string(),
            api_base_url: api.to_string(),
        }
    }

    /// Overrides both base URLs (for tests against a local stub).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.app_base_url = url.clone();
        self.api_base_url = url;
        self
    }
}

/// Midtrans gateway adapter.
pub struct MidtransGateway {
    config: MidtransGatewayConfig,
    http_client: reqwest::Client,
}

impl MidtransGateway {
    pub fn new(config: MidtransGatewayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Recomputes the callback signature over the exact payload strings.
    fn expected_signature(&self, order_id: &str, status_code: &str, gross_amount: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(self.config.server_key.expose_secret().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Maps the Midtrans status pair into the canonical vocabulary.
    ///
    /// `fraud_status` overrides settlement: a captured-but-denied
    /// transaction is Failed, a challenged one stays Pending.
    fn map_status(transaction_status: &str, fraud_status: Option<&str>) -> PaymentStatus {
        match transaction_status {
            "capture" | "settlement" => match fraud_status {
                Some("deny") => PaymentStatus::Failed,
                Some("challenge") => PaymentStatus::Pending,
                _ => PaymentStatus::Success,
            },
            "deny" | "cancel" | "failure" => PaymentStatus::Failed,
            "expire" => PaymentStatus::Expired,
            "pending" => PaymentStatus::Pending,
            // Unrecognized provider states must never settle or fail an
            // invoice on their own.
            _ => PaymentStatus::Pending,
        }
    }

    fn parse_settlement_time(raw: Option<&str>) -> Option<Timestamp> {
        let raw = raw?;
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()?;
        Some(Timestamp::from_datetime(Utc.from_utc_datetime(&naive)))
    }
}

/// Snap transaction creation response.
#[derive(Debug, Deserialize)]
struct SnapResponse {
    redirect_url: String,
}

/// Callback payload fields used for verification and normalization.
#[derive(Debug, Deserialize)]
struct MidtransCallback {
    transaction_id: String,
    order_id: String,
    status_code: String,
    gross_amount: String,
    transaction_status: String,
    #[serde(default)]
    fraud_status: Option<String>,
    #[serde(default)]
    settlement_time: Option<String>,
    #[serde(default)]
    signature_key: Option<String>,
    #[serde(default)]
    payment_type: Option<String>,
}

/// Status poll response.
#[derive(Debug, Deserialize)]
struct MidtransStatusResponse {
    transaction_status: String,
    #[serde(default)]
    fraud_status: Option<String>,
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Midtrans
    }

    async fn create_payment_link(&self, invoice: &Invoice) -> Result<PaymentLink, GatewayError> {
        let reference = MerchantReference::generate(invoice.id, &Timestamp::now());
        let url = format!("{}/snap/v1/transactions", self.config.app_base_url);

        let body = serde_json::json!({
            "transaction_details": {
                "order_id": reference.as_str(),
                "gross_amount": invoice.amount,
            },
        });

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.server_key.expose_secret(), Option::<&str>::None)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Midtrans Snap transaction failed");
            return Err(GatewayError::Provider {
                code: Some(status.as_u16().to_string()),
                message: error_text,
            });
        }

        let snap: SnapResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(PaymentLink {
            url: snap.redirect_url,
            reference,
        })
    }

    fn verify_webhook_signature(&self, request: &WebhookRequest) -> bool {
        let Ok(callback) = serde_json::from_slice::<MidtransCallback>(request.body()) else {
            return false;
        };
        let Some(provided) = callback.signature_key.as_deref() else {
            return false;
        };

        let expected = self.expected_signature(
            &callback.order_id,
            &callback.status_code,
            &callback.gross_amount,
        );
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
        let callback: MidtransCallback = serde_json::from_slice(request.body())
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let reference: MerchantReference = callback
            .order_id
            .parse()
            .map_err(|_| GatewayError::MalformedPayload("empty order_id".to_string()))?;

        let amount: rust_decimal::Decimal = callback
            .gross_amount
            .parse()
            .map_err(|_| GatewayError::MalformedPayload(format!(
                "unparseable gross_amount '{}'",
                callback.gross_amount
            )))?;

        let status =
            Self::map_status(&callback.transaction_status, callback.fraud_status.as_deref());

        let mut metadata = HashMap::new();
        metadata.insert(
            "transaction_status".to_string(),
            callback.transaction_status.clone(),
        );
        metadata.insert("status_code".to_string(), callback.status_code.clone());
        if let Some(fraud) = &callback.fraud_status {
            metadata.insert("fraud_status".to_string(), fraud.clone());
        }
        if let Some(payment_type) = &callback.payment_type {
            metadata.insert("payment_type".to_string(), payment_type.clone());
        }

        Ok(NormalizedPaymentEvent {
            transaction_id: callback.transaction_id,
            reference,
            status,
            amount,
            paid_at: Self::parse_settlement_time(callback.settlement_time.as_deref()),
            metadata,
        })
    }

    async fn get_payment_status(
        &self,
        transaction_id: &str,
    ) -> Result<PaymentStatus, GatewayError> {
        let url = format!("{}/v2/{}/status", self.config.api_base_url, transaction_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.server_key.expose_secret(), Option::<&str>::None)
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

        let parsed: MidtransStatusResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(Self::map_status(
            &parsed.transaction_status,
            parsed.fraud_status.as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SERVER_KEY: &str = "SB-Mid-server-testkey";

    fn gateway() -> MidtransGateway {
        MidtransGateway::new(MidtransGatewayConfig::new(SERVER_KEY, true))
    }

    fn signed_callback(
        order_id: &str,
        status_code: &str,
        gross_amount: &str,
        transaction_status: &str,
        fraud_status: Option<&str>,
    ) -> Vec<u8> {
        let gw = gateway();
        let signature = gw.expected_signature(order_id, status_code, gross_amount);
        let mut body = serde_json::json!({
            "transaction_id": "mt-tx-1",
            "order_id": order_id,
            "status_code": status_code,
            "gross_amount": gross_amount,
            "transaction_status": transaction_status,
            "signature_key": signature,
            "payment_type": "qris",
        });
        if let Some(fraud) = fraud_status {
            body["fraud_status"] = serde_json::json!(fraud);
        }
        serde_json::to_vec(&body).unwrap()
    }

    fn request(body: Vec<u8>) -> WebhookRequest {
        WebhookRequest::new(HashMap::new(), body, None)
    }

    // ══════════════════════════════════════════════════════════════
    // Signature verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_valid_signature() {
        let body = signed_callback("INV-42-1700000000000", "200", "150000.00", "settlement", None);
        assert!(gateway().verify_webhook_signature(&request(body)));
    }

    #[test]
    fn rejects_tampered_amount() {
        let mut body = signed_callback("INV-42-1700000000000", "200", "150000.00", "settlement", None);
        let tampered = String::from_utf8(body.clone())
            .unwrap()
            .replace("150000.00", "1.00");
        body = tampered.into_bytes();
        assert!(!gateway().verify_webhook_signature(&request(body)));
    }

    #[test]
    fn rejects_wrong_server_key() {
        let other = MidtransGateway::new(MidtransGatewayConfig::new("other-key", true));
        let body = signed_callback("INV-42", "200", "150000.00", "settlement", None);
        assert!(!other.verify_webhook_signature(&request(body)));
    }

    #[test]
    fn rejects_missing_signature_field() {
        let body = serde_json::to_vec(&serde_json::json!({
            "transaction_id": "mt-tx-1",
            "order_id": "INV-42",
            "status_code": "200",
            "gross_amount": "150000.00",
            "transaction_status": "settlement",
        }))
        .unwrap();
        assert!(!gateway().verify_webhook_signature(&request(body)));
    }

    #[test]
    fn rejects_garbage_body_without_panicking() {
        assert!(!gateway().verify_webhook_signature(&request(b"not json".to_vec())));
        assert!(!gateway().verify_webhook_signature(&request(Vec::new())));
    }

    // ══════════════════════════════════════════════════════════════
    // Status mapping
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn settlement_family_maps_to_success() {
        assert_eq!(
            MidtransGateway::map_status("settlement", None),
            PaymentStatus::Success
        );
        assert_eq!(
            MidtransGateway::map_status("capture", Some("accept")),
            PaymentStatus::Success
        );
    }

    #[test]
    fn fraud_flags_override_settlement() {
        assert_eq!(
            MidtransGateway::map_status("capture", Some("deny")),
            PaymentStatus::Failed
        );
        assert_eq!(
            MidtransGateway::map_status("capture", Some("challenge")),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn deny_cancel_failure_map_to_failed() {
        for status in ["deny", "cancel", "failure"] {
            assert_eq!(
                MidtransGateway::map_status(status, None),
                PaymentStatus::Failed
            );
        }
    }

    #[test]
    fn unrecognized_status_stays_pending() {
        assert_eq!(
            MidtransGateway::map_status("refund_chargeback_v9", None),
            PaymentStatus::Pending
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Normalization
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn normalizes_settlement_callback() {
        let body = signed_callback("INV-42-1700000000000", "200", "150000.00", "settlement", None);
        let event = gateway().parse_webhook_data(&request(body)).unwrap();

        assert_eq!(event.transaction_id, "mt-tx-1");
        assert_eq!(event.status, PaymentStatus::Success);
        assert_eq!(event.amount, dec!(150000.00));
        assert_eq!(
            event.reference.invoice_id().unwrap().as_i64(),
            42
        );
        assert_eq!(
            event.metadata.get("transaction_status"),
            Some(&"settlement".to_string())
        );
    }

    #[test]
    fn normalizes_settlement_time_when_present() {
        let gw = gateway();
        let signature = gw.expected_signature("INV-42", "200", "150000.00");
        let body = serde_json::to_vec(&serde_json::json!({
            "transaction_id": "mt-tx-1",
            "order_id": "INV-42",
            "status_code": "200",
            "gross_amount": "150000.00",
            "transaction_status": "settlement",
            "settlement_time": "2025-01-05 09:30:00",
            "signature_key": signature,
        }))
        .unwrap();

        let event = gw.parse_webhook_data(&request(body)).unwrap();
        assert!(event.paid_at.is_some());
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let result = gateway().parse_webhook_data(&request(b"[1,2,3]".to_vec()));
        assert!(matches!(result, Err(GatewayError::MalformedPayload(_))));
    }

    #[test]
    fn unparseable_amount_is_a_parse_error() {
        let gw = gateway();
        let signature = gw.expected_signature("INV-42", "200", "lots");
        let body = serde_json::to_vec(&serde_json::json!({
            "transaction_id": "mt-tx-1",
            "order_id": "INV-42",
            "status_code": "200",
            "gross_amount": "lots",
            "transaction_status": "settlement",
            "signature_key": signature,
        }))
        .unwrap();

        let result = gw.parse_webhook_data(&request(body));
        assert!(matches!(result, Err(GatewayError::MalformedPayload(_))));
    }
}
