//! Axum router for the billing API.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    cancel_invoice, create_payment_link, create_service, get_invoice, open_ticket,
    register_customer, run_billing_cycle, BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
///
/// ## Tenant-scoped endpoints (principal headers required)
/// - `POST /customers` - register a subscriber
/// - `POST /services` - subscribe a customer to a package
/// - `POST /tickets` - open a support ticket
/// - `GET /invoices/:id` - invoice with payment attempts
/// - `POST /invoices/:id/payment-link` - request a checkout link
/// - `POST /invoices/:id/cancel` - manually void an invoice
///
/// ## Operator endpoints (privileged principal required)
/// - `POST /billing-cycle/run` - run one billing sweep
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/customers", post(register_customer))
        .route("/services", post(create_service))
        .route("/tickets", post(open_ticket))
        .route("/invoices/:id", get(get_invoice))
        .route("/invoices/:id/payment-link", post(create_payment_link))
        .route("/invoices/:id/cancel", post(cancel_invoice))
        .route("/billing-cycle/run", post(run_billing_cycle))
}
