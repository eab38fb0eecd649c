//! Billing command and query handlers.

mod create_payment_link;
mod create_service;
mod get_invoice;
mod open_ticket;
mod process_webhook;
mod register_customer;
mod run_billing_cycle;

pub use create_payment_link::{
    CreatePaymentLinkCommand, CreatePaymentLinkError, CreatePaymentLinkHandler,
};
pub use create_service::{CreateServiceCommand, CreateServiceHandler};
pub use get_invoice::{GetInvoiceHandler, GetInvoiceQuery, InvoiceView};
pub use open_ticket::{OpenTicketCommand, OpenTicketHandler};
pub use process_webhook::{
    ProcessWebhookCommand, ProcessWebhookError, ProcessWebhookHandler, ProcessWebhookResult,
};
pub use register_customer::{RegisterCustomerCommand, RegisterCustomerHandler};
pub use run_billing_cycle::{RunBillingCycleCommand, RunBillingCycleHandler};
