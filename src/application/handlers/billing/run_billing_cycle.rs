//! RunBillingCycleHandler - scheduled billing sweep entry point.
//!
//! The scheduler that triggers this is an external collaborator; the
//! handler only needs an explicit privileged principal and a point in
//! time.

use std::sync::Arc;

use crate::domain::billing::{InvoiceLifecycleManager, SweepSummary};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::tenancy::Principal;

/// Command to run one billing sweep.
#[derive(Debug, Clone)]
pub struct RunBillingCycleCommand {
    /// Evaluation instant; injected so sweeps are replayable in tests.
    pub now: Timestamp,

    pub principal: Principal,
}

/// Handler for the billing sweep.
pub struct RunBillingCycleHandler {
    lifecycle: Arc<InvoiceLifecycleManager>,
}

impl RunBillingCycleHandler {
    pub fn new(lifecycle: Arc<InvoiceLifecycleManager>) -> Self {
        Self { lifecycle }
    }

    /// Runs invoice generation, the overdue sweep, and isolation
    /// eligibility. Cross-tenant by nature, so only a privileged
    /// principal may trigger it.
    pub async fn handle(&self, cmd: RunBillingCycleCommand) -> Result<SweepSummary, DomainError> {
        if !cmd.principal.is_privileged() {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Billing sweeps require a privileged principal",
            ));
        }

        let summary = self.lifecycle.run_sweep(&cmd.now).await?;

        tracing::info!(
            issued = summary.invoices_issued,
            overdue = summary.invoices_marked_overdue,
            isolation_candidates = summary.isolation_candidates.len(),
            "Billing sweep complete"
        );
        Ok(summary)
    }
}
