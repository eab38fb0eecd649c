//! Axum router for the webhook ingress.
//!
//! Webhook routes live outside the authenticated API surface: requests
//! are authenticated by provider signature, not by session.

use axum::routing::post;
use axum::Router;

use super::handlers::{handle_payment_webhook, WebhookAppState};

/// Create the webhook router.
///
/// # Routes
/// - `POST /payment/:gateway` - provider callback; `:gateway` must be one
///   of the closed provider identifiers.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/payment/:gateway", post(handle_payment_webhook))
}
