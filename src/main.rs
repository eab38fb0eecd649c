//! NetBill server binary.
//!
//! Loads configuration, wires the Postgres adapters and gateway registry
//! into the application handlers, and serves the HTTP API plus the
//! webhook ingress.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use netbill::adapters::gateways::registry_from_config;
use netbill::adapters::http::billing::{billing_routes, BillingAppState};
use netbill::adapters::http::webhooks::{webhook_routes, WebhookAppState};
use netbill::adapters::postgres::{
    PostgresCustomerRepository, PostgresInvoiceRepository, PostgresPaymentRepository,
    PostgresServiceRepository, PostgresTicketRepository,
};
use netbill::application::handlers::billing::ProcessWebhookHandler;
use netbill::config::AppConfig;
use netbill::domain::billing::{BillingPolicy, InvoiceLifecycleManager, ReconciliationEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    let customers = Arc::new(PostgresCustomerRepository::new(pool.clone()));
    let services = Arc::new(PostgresServiceRepository::new(pool.clone()));
    let invoices = Arc::new(PostgresInvoiceRepository::new(pool.clone()));
    let payments = Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let tickets = Arc::new(PostgresTicketRepository::new(pool));

    let gateways = Arc::new(registry_from_config(&config.gateway)?);

    let reconciliation = Arc::new(ReconciliationEngine::new(
        payments.clone(),
        invoices.clone(),
    ));
    let lifecycle = Arc::new(InvoiceLifecycleManager::new(
        services.clone(),
        invoices.clone(),
        BillingPolicy {
            due_days: config.billing.due_days,
            grace_period_days: config.billing.grace_period_days,
        },
    ));

    let webhook_state = WebhookAppState {
        handler: Arc::new(ProcessWebhookHandler::new(
            gateways.clone(),
            reconciliation,
        )),
    };
    let billing_state = BillingAppState {
        customers,
        services,
        invoices,
        payments,
        tickets,
        gateways: gateways.clone(),
        lifecycle,
    };

    let app = axum::Router::new()
        .nest("/webhooks", webhook_routes().with_state(webhook_state))
        .nest("/api", billing_routes().with_state(billing_state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CorsLayer::permissive());

    let addr = config.server.socket_addr();
    tracing::info!(
        %addr,
        gateways = ?gateways.configured(),
        "NetBill listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
