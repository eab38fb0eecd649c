//! In-memory repository adapters.
//!
//! Back the same ports as the Postgres adapters, on `tokio::sync::RwLock`
//! maps. Used by integration tests and local development; the payment
//! store reproduces the unique transaction-id insert contract so
//! reconciliation races behave exactly as they do against the database.

mod repositories;

pub use repositories::{
    InMemoryCustomerRepository, InMemoryInvoiceRepository, InMemoryPaymentRepository,
    InMemoryServiceRepository, InMemoryTicketRepository,
};
