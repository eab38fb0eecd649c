//! Port interfaces for external dependencies.
//!
//! Every adapter implements one of these contracts; application and
//! domain code depend only on the traits.

mod customer_repository;
mod gateway_registry;
mod invoice_repository;
mod payment_gateway;
mod payment_repository;
mod service_repository;
mod ticket_repository;

pub use customer_repository::CustomerRepository;
pub use gateway_registry::GatewayRegistry;
pub use invoice_repository::InvoiceRepository;
pub use payment_gateway::{
    GatewayError, GatewayKind, NormalizedPaymentEvent, PaymentGateway, PaymentLink,
    UnknownGateway, WebhookRequest,
};
pub use payment_repository::{PaymentRepository, SaveResult};
pub use service_repository::ServiceRepository;
pub use ticket_repository::TicketRepository;
