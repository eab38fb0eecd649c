//! Payment gateway adapters.
//!
//! One adapter per provider, all behind the `PaymentGateway` port. The
//! registry itself lives in the ports layer; this module only knows how
//! to populate it from configuration.

mod duitku;
mod midtrans;
mod xendit;

pub use duitku::{DuitkuGateway, DuitkuGatewayConfig};
pub use midtrans::{MidtransGateway, MidtransGatewayConfig};
pub use xendit::{XenditGateway, XenditGatewayConfig};

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::ports::{GatewayRegistry, PaymentGateway, UnknownGateway};

/// Builds the registry from configuration, constructing an adapter for
/// every provider with credentials.
pub fn registry_from_config(config: &GatewayConfig) -> Result<GatewayRegistry, UnknownGateway> {
    let default_kind = config.default_gateway.parse()?;

    let mut adapters: Vec<Arc<dyn PaymentGateway>> = Vec::new();

    if let Some(midtrans) = &config.midtrans {
        adapters.push(Arc::new(MidtransGateway::new(MidtransGatewayConfig::new(
            midtrans.server_key.clone(),
            midtrans.sandbox,
        ))));
    }
    if let Some(xendit) = &config.xendit {
        adapters.push(Arc::new(XenditGateway::new(XenditGatewayConfig::new(
            xendit.secret_key.clone(),
            xendit.callback_token.clone(),
        ))));
    }
    if let Some(duitku) = &config.duitku {
        adapters.push(Arc::new(DuitkuGateway::new(DuitkuGatewayConfig::new(
            duitku.merchant_code.clone(),
            duitku.api_key.clone(),
            duitku.sandbox,
        ))));
    }

    Ok(GatewayRegistry::from_adapters(adapters, default_kind))
}
