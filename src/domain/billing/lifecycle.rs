//! Invoice lifecycle manager - scheduled billing sweeps.
//!
//! Thin orchestration over the repositories: issues invoices for services
//! whose billing anchor has arrived, flags unpaid invoices overdue, and
//! reports services whose overdue age has exhausted the grace period.
//! Settlement itself happens only in the reconciliation engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, InvoiceId, ServiceId, Timestamp};
use crate::domain::tenancy::{resolve_owner_tenant, TenantScope};
use crate::ports::{InvoiceRepository, ServiceRepository};

use super::{Invoice, NewInvoice};

/// Billing sweep policy, mapped from configuration at wiring time.
#[derive(Debug, Clone, Copy)]
pub struct BillingPolicy {
    /// Days between invoice_date and due_date for generated invoices.
    pub due_days: u32,

    /// Days past due before an overdue service becomes isolation
    /// eligible.
    pub grace_period_days: u32,
}

/// Summary of one billing sweep.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepSummary {
    pub invoices_issued: usize,
    pub invoices_marked_overdue: usize,
    pub isolation_candidates: Vec<ServiceId>,
}

/// Orchestrates invoice generation and overdue evaluation.
pub struct InvoiceLifecycleManager {
    services: Arc<dyn ServiceRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    policy: BillingPolicy,
}

impl InvoiceLifecycleManager {
    pub fn new(
        services: Arc<dyn ServiceRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            services,
            invoices,
            policy,
        }
    }

    /// Issues invoices for every active service whose billing anchor is
    /// at or before `now`, advancing each anchor by one month.
    ///
    /// System path: runs unrestricted across all tenants; each invoice
    /// inherits its tenant from the owning service.
    pub async fn generate_due_invoices(&self, now: &Timestamp) -> Result<Vec<Invoice>, DomainError> {
        let billable = self
            .services
            .list_billable(&TenantScope::unrestricted(), now)
            .await?;

        let mut issued = Vec::with_capacity(billable.len());
        for mut service in billable {
            if !service.is_billable(now) {
                continue;
            }

            let service_tenant = service.tenant;
            let tenant = resolve_owner_tenant(None, || async move { Some(service_tenant) }).await;

            let new = NewInvoice::new(
                service.id,
                service.monthly_fee,
                *now,
                now.add_days(self.policy.due_days as i64),
                tenant,
            )?;
            let invoice = self.invoices.insert(new).await?;

            service.advance_billing_anchor();
            self.services.update(&service).await?;

            issued.push(invoice);
        }

        if !issued.is_empty() {
            tracing::info!(count = issued.len(), "Issued invoices for due services");
        }
        Ok(issued)
    }

    /// Flags unpaid invoices past their due_date as overdue.
    pub async fn mark_overdue(&self, now: &Timestamp) -> Result<usize, DomainError> {
        let due = self
            .invoices
            .list_unpaid_due_before(&TenantScope::unrestricted(), now)
            .await?;

        let mut flagged = 0;
        for mut invoice in due {
            if invoice.mark_overdue(now).is_ok() {
                self.invoices.update(&invoice).await?;
                flagged += 1;
            }
        }

        if flagged > 0 {
            tracing::info!(count = flagged, "Marked invoices overdue");
        }
        Ok(flagged)
    }

    /// Services owning an overdue invoice whose age past due exceeds the
    /// grace period. The actual isolation command belongs to the
    /// provisioning layer.
    pub async fn isolation_candidates(
        &self,
        now: &Timestamp,
    ) -> Result<Vec<ServiceId>, DomainError> {
        let overdue = self
            .invoices
            .list_overdue(&TenantScope::unrestricted())
            .await?;

        let candidates: BTreeSet<ServiceId> = overdue
            .into_iter()
            .filter(|invoice| invoice.days_overdue(now) > self.policy.grace_period_days as i64)
            .map(|invoice| invoice.service_id)
            .collect();

        Ok(candidates.into_iter().collect())
    }

    /// Runs all three sweeps in order.
    pub async fn run_sweep(&self, now: &Timestamp) -> Result<SweepSummary, DomainError> {
        let issued = self.generate_due_invoices(now).await?;
        let overdue = self.mark_overdue(now).await?;
        let candidates = self.isolation_candidates(now).await?;
        Ok(SweepSummary {
            invoices_issued: issued.len(),
            invoices_marked_overdue: overdue,
            isolation_candidates: candidates,
        })
    }

    /// Manually voids an invoice, within the caller's scope.
    ///
    /// Cross-tenant attempts surface as not found.
    pub async fn cancel_invoice(
        &self,
        scope: &TenantScope,
        id: InvoiceId,
    ) -> Result<Invoice, DomainError> {
        let mut invoice = self
            .invoices
            .find_by_id(scope, id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::InvoiceNotFound, format!("Invoice {} not found", id))
            })?;

        invoice.cancel()?;
        self.invoices.update(&invoice).await?;
        Ok(invoice)
    }
}
