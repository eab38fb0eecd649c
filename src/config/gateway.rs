//! Payment gateway configuration
//!
//! Each supported gateway has its own optional credentials section so
//! operators can enable any subset of providers. The configured default
//! gateway is used when a payment-link request does not name one.

use serde::Deserialize;

use super::error::ValidationError;

/// Gateway identifiers accepted in configuration and webhook routes.
pub const KNOWN_GATEWAYS: [&str; 3] = ["midtrans", "xendit", "duitku"];

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway used when a payment-link request does not specify one
    #[serde(default = "default_gateway")]
    pub default_gateway: String,

    /// Midtrans credentials (Snap API)
    pub midtrans: Option<MidtransConfig>,

    /// Xendit credentials (Invoice API)
    pub xendit: Option<XenditConfig>,

    /// Duitku credentials (payment inquiry API)
    pub duitku: Option<DuitkuConfig>,
}

/// Midtrans credentials
#[derive(Debug, Clone, Deserialize)]
pub struct MidtransConfig {
    /// Server key used for API auth and callback signatures
    pub server_key: String,

    /// Use the sandbox endpoints instead of production
    #[serde(default)]
    pub sandbox: bool,
}

/// Xendit credentials
#[derive(Debug, Clone, Deserialize)]
pub struct XenditConfig {
    /// Secret API key for invoice creation
    pub secret_key: String,

    /// Static callback verification token from the Xendit dashboard
    pub callback_token: String,
}

/// Duitku credentials
#[derive(Debug, Clone, Deserialize)]
pub struct DuitkuConfig {
    /// Merchant code assigned by Duitku
    pub merchant_code: String,

    /// API key used for request and callback signatures
    pub api_key: String,

    /// Use the sandbox endpoints instead of production
    #[serde(default)]
    pub sandbox: bool,
}

impl GatewayConfig {
    /// True if credentials are configured for the named gateway.
    pub fn is_enabled(&self, gateway: &str) -> bool {
        match gateway {
            "midtrans" => self.midtrans.is_some(),
            "xendit" => self.xendit.is_some(),
            "duitku" => self.duitku.is_some(),
            _ => false,
        }
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !KNOWN_GATEWAYS.contains(&self.default_gateway.as_str()) {
            return Err(ValidationError::UnknownDefaultGateway(
                self.default_gateway.clone(),
            ));
        }
        if !self.is_enabled(&self.default_gateway) {
            return Err(ValidationError::DefaultGatewayNotConfigured(
                self.default_gateway.clone(),
            ));
        }

        if let Some(midtrans) = &self.midtrans {
            if midtrans.server_key.is_empty() {
                return Err(ValidationError::EmptyGatewayCredential("midtrans.server_key"));
            }
        }
        if let Some(xendit) = &self.xendit {
            if xendit.secret_key.is_empty() {
                return Err(ValidationError::EmptyGatewayCredential("xendit.secret_key"));
            }
            if xendit.callback_token.is_empty() {
                return Err(ValidationError::EmptyGatewayCredential(
                    "xendit.callback_token",
                ));
            }
        }
        if let Some(duitku) = &self.duitku {
            if duitku.merchant_code.is_empty() {
                return Err(ValidationError::EmptyGatewayCredential(
                    "duitku.merchant_code",
                ));
            }
            if duitku.api_key.is_empty() {
                return Err(ValidationError::EmptyGatewayCredential("duitku.api_key"));
            }
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_gateway: default_gateway(),
            midtrans: None,
            xendit: None,
            duitku: None,
        }
    }
}

fn default_gateway() -> String {
    "midtrans".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midtrans() -> MidtransConfig {
        MidtransConfig {
            server_key: "SB-Mid-server-xxx".to_string(),
            sandbox: true,
        }
    }

    #[test]
    fn test_default_gateway_must_be_known() {
        let config = GatewayConfig {
            default_gateway: "paypal".to_string(),
            midtrans: Some(midtrans()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::UnknownDefaultGateway(_))
        ));
    }

    #[test]
    fn test_default_gateway_must_have_credentials() {
        let config = GatewayConfig {
            default_gateway: "xendit".to_string(),
            midtrans: Some(midtrans()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DefaultGatewayNotConfigured(_))
        ));
    }

    #[test]
    fn test_empty_credential_rejected() {
        let config = GatewayConfig {
            default_gateway: "midtrans".to_string(),
            midtrans: Some(MidtransConfig {
                server_key: String::new(),
                sandbox: false,
            }),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyGatewayCredential(_))
        ));
    }

    #[test]
    fn test_valid_subset_of_gateways() {
        let config = GatewayConfig {
            default_gateway: "midtrans".to_string(),
            midtrans: Some(midtrans()),
            xendit: None,
            duitku: None,
        };
        assert!(config.validate().is_ok());
        assert!(config.is_enabled("midtrans"));
        assert!(!config.is_enabled("xendit"));
    }
}
