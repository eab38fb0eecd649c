//! Billing domain: subscribers, services, invoices, payments.

mod customer;
mod invoice;
mod lifecycle;
mod merchant_reference;
mod payment;
mod reconciliation;
mod service;
mod ticket;

pub use customer::{Customer, CustomerStatus, NewCustomer};
pub use invoice::{Invoice, InvoiceStatus, NewInvoice};
pub use lifecycle::{BillingPolicy, InvoiceLifecycleManager, SweepSummary};
pub use merchant_reference::MerchantReference;
pub use payment::{Payment, PaymentStatus};
pub use reconciliation::{ReconcileError, ReconcileOutcome, ReconciliationEngine};
pub use service::{NewService, Service, ServiceStatus};
pub use ticket::{NewTicket, Ticket, TicketStatus};
