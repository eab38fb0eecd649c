//! Webhook ingress HTTP module.

mod handlers;
mod routes;

pub use handlers::{handle_payment_webhook, WebhookAck, WebhookAppState};
pub use routes::webhook_routes;
