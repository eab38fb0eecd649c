//! Merchant reference correlating outbound payment links with inbound
//! callbacks.
//!
//! Format: `INV-{invoice_id}-{nonce}`. The nonce makes every payment-link
//! attempt unique so gateway-side order-id collisions on retried links
//! cannot occur. Callback parsers accept both the composite form and a
//! bare numeric invoice id (some providers echo only the number the
//! operator typed into their dashboard tooling).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{InvoiceId, Timestamp, ValidationError};

/// Reference string carried through a gateway checkout round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantReference {
    raw: String,
}

impl MerchantReference {
    /// Generates a reference for a new payment-link attempt.
    ///
    /// The millisecond timestamp nonce guarantees a fresh reference per
    /// attempt; references are correlation handles, not secrets.
    pub fn generate(invoice_id: InvoiceId, now: &Timestamp) -> Self {
        Self {
            raw: format!(
                "INV-{}-{}",
                invoice_id.as_i64(),
                now.as_datetime().timestamp_millis()
            ),
        }
    }

    /// Extracts the invoice id from a reference echoed back by a
    /// provider.
    ///
    /// Accepts `INV-{id}-{nonce}`, `INV-{id}`, and a bare numeric id.
    pub fn invoice_id(&self) -> Result<InvoiceId, ValidationError> {
        let segment = match self.raw.strip_prefix("INV-") {
            Some(rest) => rest.split('-').next().unwrap_or(rest),
            None => self.raw.as_str(),
        };
        segment.parse::<InvoiceId>().map_err(|_| {
            ValidationError::invalid_format(
                "merchant_reference",
                format!("cannot extract invoice id from '{}'", self.raw),
            )
        })
    }

    /// Returns the reference as sent to the provider.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Truncated form for log lines; never log payloads wholesale.
    pub fn redacted(&self) -> String {
        if self.raw.len() <= 12 {
            self.raw.clone()
        } else {
            format!("{}…", &self.raw[..12])
        }
    }
}

impl fmt::Display for MerchantReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for MerchantReference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError::empty_field("merchant_reference"));
        }
        Ok(Self { raw: s.to_string() })
    }
}
