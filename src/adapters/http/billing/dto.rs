//! Request/response DTOs for the billing API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::InvoiceView;
use crate::domain::billing::{
    Customer, CustomerStatus, Invoice, InvoiceStatus, Payment, PaymentStatus, Service,
    ServiceStatus, SweepSummary, Ticket, TicketStatus,
};
use crate::domain::foundation::Timestamp;
use crate::ports::PaymentLink;

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct RegisterCustomerRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub customer_id: i64,
    pub package_id: i64,
    pub router_id: i64,
    pub monthly_fee: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OpenTicketRequest {
    pub customer_id: i64,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePaymentLinkRequest {
    /// Provider identifier; the configured default applies when absent.
    #[serde(default)]
    pub gateway: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: CustomerStatus,
    pub tenant_id: Option<i64>,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id.as_i64(),
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            status: customer.status,
            tenant_id: customer.tenant.map(|t| t.as_i64()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: i64,
    pub customer_id: i64,
    pub package_id: i64,
    pub router_id: i64,
    pub monthly_fee: Decimal,
    pub status: ServiceStatus,
    pub tenant_id: Option<i64>,
    pub next_invoice_date: Timestamp,
}

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: service.id.as_i64(),
            customer_id: service.customer_id.as_i64(),
            package_id: service.package_id.as_i64(),
            router_id: service.router_id.as_i64(),
            monthly_fee: service.monthly_fee,
            status: service.status,
            tenant_id: service.tenant.map(|t| t.as_i64()),
            next_invoice_date: service.next_invoice_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub customer_id: i64,
    pub subject: String,
    pub status: TicketStatus,
    pub assigned_to: Option<String>,
    pub tenant_id: Option<i64>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id.as_i64(),
            customer_id: ticket.customer_id.as_i64(),
            subject: ticket.subject,
            status: ticket.status,
            assigned_to: ticket.assigned_to.map(|u| u.to_string()),
            tenant_id: ticket.tenant.map(|t| t.as_i64()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub transaction_id: String,
    pub gateway: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            transaction_id: payment.transaction_id,
            gateway: payment.gateway,
            amount: payment.amount,
            status: payment.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: i64,
    pub service_id: i64,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub invoice_date: Timestamp,
    pub due_date: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub payment_link_url: Option<String>,
    pub tenant_id: Option<i64>,
    pub payments: Vec<PaymentResponse>,
}

impl From<InvoiceView> for InvoiceResponse {
    fn from(view: InvoiceView) -> Self {
        Self::from_parts(view.invoice, view.payments)
    }
}

impl InvoiceResponse {
    fn from_parts(invoice: Invoice, payments: Vec<Payment>) -> Self {
        Self {
            id: invoice.id.as_i64(),
            service_id: invoice.service_id.as_i64(),
            amount: invoice.amount,
            status: invoice.status,
            invoice_date: invoice.invoice_date,
            due_date: invoice.due_date,
            paid_at: invoice.paid_at,
            payment_link_url: invoice.payment_link_url,
            tenant_id: invoice.tenant.map(|t| t.as_i64()),
            payments: payments.into_iter().map(PaymentResponse::from).collect(),
        }
    }

    pub fn without_payments(invoice: Invoice) -> Self {
        Self::from_parts(invoice, Vec::new())
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentLinkResponse {
    pub url: String,
    pub reference: String,
}

impl From<PaymentLink> for PaymentLinkResponse {
    fn from(link: PaymentLink) -> Self {
        Self {
            url: link.url,
            reference: link.reference.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub invoices_issued: usize,
    pub invoices_marked_overdue: usize,
    pub isolation_candidates: Vec<i64>,
}

impl From<SweepSummary> for SweepResponse {
    fn from(summary: SweepSummary) -> Self {
        Self {
            invoices_issued: summary.invoices_issued,
            invoices_marked_overdue: summary.invoices_marked_overdue,
            isolation_candidates: summary
                .isolation_candidates
                .into_iter()
                .map(|s| s.as_i64())
                .collect(),
        }
    }
}
