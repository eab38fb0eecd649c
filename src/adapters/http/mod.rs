//! HTTP adapters (axum).

pub mod billing;
mod principal;
pub mod webhooks;

pub use principal::{PrincipalRejection, RequestPrincipal};

use serde::{Deserialize, Serialize};

/// Uniform error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
