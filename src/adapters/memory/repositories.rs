//! RwLock-backed implementations of the repository ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{
    Customer, CustomerStatus, Invoice, InvoiceStatus, NewCustomer, NewInvoice, NewService,
    NewTicket, Payment, Service, ServiceStatus, Ticket, TicketStatus,
};
use crate::domain::foundation::{
    CustomerId, DomainError, InvoiceId, ServiceId, TicketId, Timestamp,
};
use crate::domain::tenancy::TenantScope;
use crate::ports::{
    CustomerRepository, InvoiceRepository, PaymentRepository, SaveResult, ServiceRepository,
    TicketRepository,
};

// ════════════════════════════════════════════════════════════════════════════════
// Customers
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory customer store.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    rows: RwLock<HashMap<i64, Customer>>,
    sequence: AtomicI64,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn insert(&self, new: NewCustomer) -> Result<Customer, DomainError> {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let customer = Customer::from_parts(
            CustomerId::from_i64(id),
            new,
            CustomerStatus::PendingSurvey,
            Timestamp::now(),
        );
        self.rows.write().await.insert(id, customer.clone());
        Ok(customer)
    }

    async fn update(&self, customer: &Customer) -> Result<(), DomainError> {
        self.rows
            .write()
            .await
            .insert(customer.id.as_i64(), customer.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: CustomerId,
    ) -> Result<Option<Customer>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id.as_i64())
            .filter(|c| scope.permits(c.tenant))
            .cloned())
    }

    async fn list(&self, scope: &TenantScope) -> Result<Vec<Customer>, DomainError> {
        let mut customers: Vec<Customer> = self
            .rows
            .read()
            .await
            .values()
            .filter(|c| scope.permits(c.tenant))
            .cloned()
            .collect();
        customers.sort_by_key(|c| std::cmp::Reverse(c.id.as_i64()));
        Ok(customers)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Services
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory service store.
#[derive(Default)]
pub struct InMemoryServiceRepository {
    rows: RwLock<HashMap<i64, Service>>,
    sequence: AtomicI64,
}

impl InMemoryServiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a service row as-is (tests).
    pub async fn seed(&self, service: Service) {
        self.rows
            .write()
            .await
            .insert(service.id.as_i64(), service);
    }
}

#[async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn insert(&self, new: NewService) -> Result<Service, DomainError> {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let service = Service::from_parts(
            ServiceId::from_i64(id),
            new,
            ServiceStatus::Pending,
            Timestamp::now(),
        );
        self.rows.write().await.insert(id, service.clone());
        Ok(service)
    }

    async fn update(&self, service: &Service) -> Result<(), DomainError> {
        self.rows
            .write()
            .await
            .insert(service.id.as_i64(), service.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: ServiceId,
    ) -> Result<Option<Service>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id.as_i64())
            .filter(|s| scope.permits(s.tenant))
            .cloned())
    }

    async fn list_for_customer(
        &self,
        scope: &TenantScope,
        customer_id: CustomerId,
    ) -> Result<Vec<Service>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.customer_id == customer_id && scope.permits(s.tenant))
            .cloned()
            .collect())
    }

    async fn list_billable(
        &self,
        scope: &TenantScope,
        now: &Timestamp,
    ) -> Result<Vec<Service>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.is_billable(now) && scope.permits(s.tenant))
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Invoices
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory invoice store.
#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    rows: RwLock<HashMap<i64, Invoice>>,
    sequence: AtomicI64,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an invoice row as-is (tests).
    pub async fn seed(&self, invoice: Invoice) {
        self.rows
            .write()
            .await
            .insert(invoice.id.as_i64(), invoice);
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, new: NewInvoice) -> Result<Invoice, DomainError> {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let invoice = Invoice::from_parts(InvoiceId::from_i64(id), new);
        self.rows.write().await.insert(id, invoice.clone());
        Ok(invoice)
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        self.rows
            .write()
            .await
            .insert(invoice.id.as_i64(), invoice.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id.as_i64())
            .filter(|i| scope.permits(i.tenant))
            .cloned())
    }

    async fn list_for_service(
        &self,
        scope: &TenantScope,
        service_id: ServiceId,
    ) -> Result<Vec<Invoice>, DomainError> {
        let mut invoices: Vec<Invoice> = self
            .rows
            .read()
            .await
            .values()
            .filter(|i| i.service_id == service_id && scope.permits(i.tenant))
            .cloned()
            .collect();
        invoices.sort_by_key(|i| std::cmp::Reverse(i.id.as_i64()));
        Ok(invoices)
    }

    async fn list_unpaid_due_before(
        &self,
        scope: &TenantScope,
        cutoff: &Timestamp,
    ) -> Result<Vec<Invoice>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|i| {
                i.status == InvoiceStatus::Unpaid
                    && i.due_date.is_before(cutoff)
                    && scope.permits(i.tenant)
            })
            .cloned()
            .collect())
    }

    async fn list_overdue(&self, scope: &TenantScope) -> Result<Vec<Invoice>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|i| i.status == InvoiceStatus::Overdue && scope.permits(i.tenant))
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory payment store keyed on the unique transaction id.
///
/// The write lock held across the contains/insert pair makes the
/// duplicate check atomic, mirroring the database unique constraint.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    rows: RwLock<HashMap<String, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payments (tests).
    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&payment.transaction_id) {
            Ok(SaveResult::AlreadyExists)
        } else {
            rows.insert(payment.transaction_id.clone(), payment.clone());
            Ok(SaveResult::Inserted)
        }
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self.rows.read().await.get(transaction_id).cloned())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        self.rows
            .write()
            .await
            .insert(payment.transaction_id.clone(), payment.clone());
        Ok(())
    }

    async fn list_for_invoice(
        &self,
        scope: &TenantScope,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|p| p.invoice_id == invoice_id && scope.permits(p.tenant))
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tickets
// ════════════════════════════════════════════════════════════════════════════════

/// In-memory ticket store.
#[derive(Default)]
pub struct InMemoryTicketRepository {
    rows: RwLock<HashMap<i64, Ticket>>,
    sequence: AtomicI64,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn insert(&self, new: NewTicket) -> Result<Ticket, DomainError> {
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = Ticket::from_parts(
            TicketId::from_i64(id),
            new,
            TicketStatus::Open,
            Timestamp::now(),
        );
        self.rows.write().await.insert(id, ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, ticket: &Ticket) -> Result<(), DomainError> {
        self.rows
            .write()
            .await
            .insert(ticket.id.as_i64(), ticket.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: TicketId,
    ) -> Result<Option<Ticket>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id.as_i64())
            .filter(|t| scope.permits(t.tenant))
            .cloned())
    }

    async fn list_for_customer(
        &self,
        scope: &TenantScope,
        customer_id: CustomerId,
    ) -> Result<Vec<Ticket>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|t| t.customer_id == customer_id && scope.permits(t.tenant))
            .cloned()
            .collect())
    }
}
