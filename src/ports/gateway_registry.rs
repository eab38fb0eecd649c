//! Gateway dispatch registry.
//!
//! Maps route identifiers to configured adapters. Only providers with
//! credentials are registered; a request naming a known but unconfigured
//! provider is rejected the same way as an unknown one.

use std::collections::HashMap;
use std::sync::Arc;

use super::payment_gateway::{GatewayKind, PaymentGateway};

/// Dispatch table from route identifier to adapter.
pub struct GatewayRegistry {
    adapters: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
    default_kind: GatewayKind,
}

impl GatewayRegistry {
    /// Builds a registry from explicit adapters.
    pub fn from_adapters(
        adapters: Vec<Arc<dyn PaymentGateway>>,
        default_kind: GatewayKind,
    ) -> Self {
        Self {
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.kind(), adapter))
                .collect(),
            default_kind,
        }
    }

    /// Looks up the adapter for a provider, if configured.
    pub fn get(&self, kind: GatewayKind) -> Option<Arc<dyn PaymentGateway>> {
        self.adapters.get(&kind).cloned()
    }

    /// Provider used when a payment-link request does not name one.
    pub fn default_kind(&self) -> GatewayKind {
        self.default_kind
    }

    /// Configured providers, for diagnostics.
    pub fn configured(&self) -> Vec<GatewayKind> {
        let mut kinds: Vec<GatewayKind> = self.adapters.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}
