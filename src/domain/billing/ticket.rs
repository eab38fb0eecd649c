//! Support ticket aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CustomerId, DomainError, StateMachine, TenantId, TicketId, Timestamp, UserId, ValidationError,
};

/// Status of a support ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl StateMachine for TicketStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TicketStatus::*;
        matches!(
            (self, target),
            (Open, InProgress)
                | (Open, Closed)
                | (InProgress, Resolved)
                | (InProgress, Open)
                | (Resolved, Closed)
                | (Resolved, Open)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TicketStatus::*;
        match self {
            Open => vec![InProgress, Closed],
            InProgress => vec![Resolved, Open],
            Resolved => vec![Closed, Open],
            Closed => vec![],
        }
    }
}

/// Payload for opening a ticket; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub customer_id: CustomerId,
    pub subject: String,
    pub body: String,
    /// Owner, resolved from the customer before the first write.
    pub tenant: Option<TenantId>,
}

impl NewTicket {
    pub fn new(
        customer_id: CustomerId,
        subject: impl Into<String>,
        body: impl Into<String>,
        tenant: Option<TenantId>,
    ) -> Result<Self, ValidationError> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(ValidationError::empty_field("subject"));
        }
        Ok(Self {
            customer_id,
            subject,
            body: body.into(),
            tenant,
        })
    }
}

/// A customer support request, optionally assigned to a technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub customer_id: CustomerId,
    pub subject: String,
    pub body: String,
    pub status: TicketStatus,
    pub assigned_to: Option<UserId>,
    pub tenant: Option<TenantId>,
    pub created_at: Timestamp,
}

impl Ticket {
    /// Hydrates a ticket from stored state.
    pub fn from_parts(
        id: TicketId,
        new: NewTicket,
        status: TicketStatus,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            customer_id: new.customer_id,
            subject: new.subject,
            body: new.body,
            status,
            assigned_to: None,
            tenant: new.tenant,
            created_at,
        }
    }

    /// Assigns the ticket to a technician and moves it in progress.
    pub fn assign(&mut self, technician: UserId) -> Result<(), DomainError> {
        self.status = self.status.transition_to(TicketStatus::InProgress)?;
        self.assigned_to = Some(technician);
        Ok(())
    }

    /// Moves the ticket to a new status, validating the transition table.
    pub fn set_status(&mut self, target: TicketStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target)?;
        Ok(())
    }
}
