//! Integration tests for the webhook ingress.
//!
//! Drives the real axum router with in-memory repositories and real
//! gateway adapters, verifying the full Receive -> Authenticate ->
//! Normalize -> Dispatch pipeline and its response policy.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use sha2::{Digest, Sha512};
use tower::ServiceExt;

use netbill::adapters::gateways::{
    MidtransGateway, MidtransGatewayConfig, XenditGateway, XenditGatewayConfig,
};
use netbill::adapters::http::webhooks::{webhook_routes, WebhookAppState};
use netbill::adapters::memory::{InMemoryInvoiceRepository, InMemoryPaymentRepository};
use netbill::application::handlers::billing::ProcessWebhookHandler;
use netbill::domain::billing::{
    Invoice, InvoiceStatus, NewInvoice, PaymentStatus, ReconciliationEngine,
};
use netbill::domain::foundation::{InvoiceId, ServiceId, Timestamp};
use netbill::domain::tenancy::TenantScope;
use netbill::ports::{
    GatewayKind, GatewayRegistry, InvoiceRepository, PaymentGateway, PaymentRepository,
};

const MIDTRANS_SERVER_KEY: &str = "SB-Mid-server-integration";
const XENDIT_TOKEN: &str = "xnd-callback-token-integration";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    invoices: Arc<InMemoryInvoiceRepository>,
    payments: Arc<InMemoryPaymentRepository>,
}

async fn test_app() -> TestApp {
    let invoices = Arc::new(InMemoryInvoiceRepository::new());
    let payments = Arc::new(InMemoryPaymentRepository::new());

    let registry = GatewayRegistry::from_adapters(
        vec![
            Arc::new(MidtransGateway::new(MidtransGatewayConfig::new(
                MIDTRANS_SERVER_KEY,
                true,
            ))) as Arc<dyn PaymentGateway>,
            Arc::new(XenditGateway::new(XenditGatewayConfig::new(
                "xnd_development_key",
                XENDIT_TOKEN,
            ))),
        ],
        GatewayKind::Midtrans,
    );

    let engine = Arc::new(ReconciliationEngine::new(
        payments.clone() as Arc<dyn PaymentRepository>,
        invoices.clone() as Arc<dyn InvoiceRepository>,
    ));
    let state = WebhookAppState {
        handler: Arc::new(ProcessWebhookHandler::new(Arc::new(registry), engine)),
    };

    TestApp {
        router: Router::new().nest("/webhooks", webhook_routes().with_state(state)),
        invoices,
        payments,
    }
}

async fn seed_unpaid_invoice(app: &TestApp, id: i64) {
    let invoice = Invoice::from_parts(
        InvoiceId::from_i64(id),
        NewInvoice::new(
            ServiceId::from_i64(1),
            dec!(150000.00),
            Timestamp::now(),
            Timestamp::now().add_days(7),
            None,
        )
        .unwrap(),
    );
    app.invoices.seed(invoice).await;
}

fn midtrans_signature(order_id: &str, status_code: &str, gross_amount: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(MIDTRANS_SERVER_KEY.as_bytes());
    hex::encode(hasher.finalize())
}

fn midtrans_settlement_body(transaction_id: &str, order_id: &str) -> Vec<u8> {
    let signature = midtrans_signature(order_id, "200", "150000.00");
    serde_json::to_vec(&serde_json::json!({
        "transaction_id": transaction_id,
        "order_id": order_id,
        "status_code": "200",
        "gross_amount": "150000.00",
        "transaction_status": "settlement",
        "signature_key": signature,
    }))
    .unwrap()
}

async fn post_webhook(app: &TestApp, gateway: &str, body: Vec<u8>) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/webhooks/payment/{}", gateway))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    app.router.clone().oneshot(request).await.unwrap().status()
}

async fn invoice_status(app: &TestApp, id: i64) -> InvoiceStatus {
    app.invoices
        .find_by_id(&TenantScope::unrestricted(), InvoiceId::from_i64(id))
        .await
        .unwrap()
        .unwrap()
        .status
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn settlement_webhook_marks_invoice_paid() {
    let app = test_app().await;
    seed_unpaid_invoice(&app, 42).await;

    let status = post_webhook(
        &app,
        "midtrans",
        midtrans_settlement_body("tx-1", "INV-42-1700000000000"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice_status(&app, 42).await, InvoiceStatus::Paid);

    let payment = app
        .payments
        .find_by_transaction_id("tx-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);

    let invoice = app
        .invoices
        .find_by_id(&TenantScope::unrestricted(), InvoiceId::from_i64(42))
        .await
        .unwrap()
        .unwrap();
    assert!(invoice.paid_at.is_some());
}

#[tokio::test]
async fn redelivered_webhook_is_acknowledged_without_side_effects() {
    let app = test_app().await;
    seed_unpaid_invoice(&app, 42).await;
    let body = midtrans_settlement_body("tx-1", "INV-42-1700000000000");

    assert_eq!(post_webhook(&app, "midtrans", body.clone()).await, StatusCode::OK);
    assert_eq!(post_webhook(&app, "midtrans", body).await, StatusCode::OK);

    assert_eq!(app.payments.count().await, 1);
    assert_eq!(invoice_status(&app, 42).await, InvoiceStatus::Paid);
}

#[tokio::test]
async fn unknown_gateway_is_rejected_before_dispatch() {
    let app = test_app().await;
    seed_unpaid_invoice(&app, 42).await;

    let status = post_webhook(&app, "foo", b"{}".to_vec()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.payments.count().await, 0);
}

#[tokio::test]
async fn configured_but_absent_gateway_is_rejected() {
    // duitku is a valid identifier but has no adapter registered here.
    let app = test_app().await;

    let status = post_webhook(&app, "duitku", b"{}".to_vec()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_signature_is_rejected_and_discarded() {
    let app = test_app().await;
    seed_unpaid_invoice(&app, 42).await;

    let body = serde_json::to_vec(&serde_json::json!({
        "transaction_id": "tx-forged",
        "order_id": "INV-42",
        "status_code": "200",
        "gross_amount": "150000.00",
        "transaction_status": "settlement",
        "signature_key": "deadbeef",
    }))
    .unwrap();

    let status = post_webhook(&app, "midtrans", body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.payments.count().await, 0);
    assert_eq!(invoice_status(&app, 42).await, InvoiceStatus::Unpaid);
}

#[tokio::test]
async fn xendit_callback_with_static_token_settles_invoice() {
    let app = test_app().await;
    seed_unpaid_invoice(&app, 7).await;

    let body = serde_json::to_vec(&serde_json::json!({
        "id": "xnd-inv-1",
        "external_id": "INV-7-1700000000000",
        "status": "PAID",
        "amount": 150000.00,
        "paid_at": "2025-01-05T09:30:00.000Z",
    }))
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/payment/xendit")
        .header("content-type", "application/json")
        .header("x-callback-token", XENDIT_TOKEN)
        .body(Body::from(body))
        .unwrap();

    let status = app.router.clone().oneshot(request).await.unwrap().status();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice_status(&app, 7).await, InvoiceStatus::Paid);
}

#[tokio::test]
async fn unresolvable_reference_is_acknowledged_for_manual_review() {
    let app = test_app().await;
    // No invoice 999 exists.
    let status = post_webhook(
        &app,
        "midtrans",
        midtrans_settlement_body("tx-9", "INV-999"),
    )
    .await;

    // Acknowledged: redelivery cannot fix a data mismatch.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.payments.count().await, 0);
}

#[tokio::test]
async fn expired_then_success_attempts_settle_eventually() {
    let app = test_app().await;
    seed_unpaid_invoice(&app, 42).await;

    let expired = {
        let signature = midtrans_signature("INV-42", "407", "150000.00");
        serde_json::to_vec(&serde_json::json!({
            "transaction_id": "tx-old",
            "order_id": "INV-42",
            "status_code": "407",
            "gross_amount": "150000.00",
            "transaction_status": "expire",
            "signature_key": signature,
        }))
        .unwrap()
    };

    assert_eq!(post_webhook(&app, "midtrans", expired).await, StatusCode::OK);
    assert_eq!(invoice_status(&app, 42).await, InvoiceStatus::Unpaid);

    let success = midtrans_settlement_body("tx-new", "INV-42");
    assert_eq!(post_webhook(&app, "midtrans", success).await, StatusCode::OK);
    assert_eq!(invoice_status(&app, 42).await, InvoiceStatus::Paid);
    assert_eq!(app.payments.count().await, 2);
}
