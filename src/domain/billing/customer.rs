//! Customer aggregate and onboarding state machine.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CustomerId, DomainError, StateMachine, TenantId, Timestamp, ValidationError,
};

/// Customer onboarding and service lifecycle status.
///
/// New registrations walk the survey pipeline before activation; isolation
/// and termination are handled at the service level, suspension here covers
/// the whole account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    /// Registered, waiting for a site survey to be scheduled.
    PendingSurvey,

    /// Survey appointment booked.
    SurveyScheduled,

    /// Survey done, awaiting approval decision.
    SurveyComplete,

    /// Approved for installation.
    Approved,

    /// At least one active service.
    Active,

    /// Account-wide suspension (e.g., fraud hold).
    Suspended,

    /// Account closed.
    Terminated,
}

impl StateMachine for CustomerStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CustomerStatus::*;
        matches!(
            (self, target),
            (PendingSurvey, SurveyScheduled)
                | (PendingSurvey, Terminated)
                | (SurveyScheduled, SurveyComplete)
                | (SurveyScheduled, Terminated)
                | (SurveyComplete, Approved)
                | (SurveyComplete, Terminated)
                | (Approved, Active)
                | (Approved, Terminated)
                | (Active, Suspended)
                | (Active, Terminated)
                | (Suspended, Active)
                | (Suspended, Terminated)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CustomerStatus::*;
        match self {
            PendingSurvey => vec![SurveyScheduled, Terminated],
            SurveyScheduled => vec![SurveyComplete, Terminated],
            SurveyComplete => vec![Approved, Terminated],
            Approved => vec![Active, Terminated],
            Active => vec![Suspended, Terminated],
            Suspended => vec![Active, Terminated],
            Terminated => vec![],
        }
    }
}

/// Payload for creating a customer; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Owner, assigned once at creation from the acting principal.
    pub tenant: Option<TenantId>,
}

impl NewCustomer {
    /// Validates identity fields.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        tenant: Option<TenantId>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        let email = email.into();
        if !email.contains('@') {
            return Err(ValidationError::invalid_format("email", "missing @"));
        }
        Ok(Self {
            name,
            email,
            phone: phone.into(),
            tenant,
        })
    }
}

/// A subscriber account.
///
/// `tenant` is assigned at creation and never reassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: CustomerStatus,
    pub tenant: Option<TenantId>,
    pub created_at: Timestamp,
}

impl Customer {
    /// Hydrates a customer from stored state.
    pub fn from_parts(
        id: CustomerId,
        new: NewCustomer,
        status: CustomerStatus,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            status,
            tenant: new.tenant,
            created_at,
        }
    }

    /// Moves the customer to a new lifecycle status, validating the
    /// transition table.
    pub fn set_status(&mut self, target: CustomerStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_pipeline_transitions() {
        use CustomerStatus::*;
        assert!(PendingSurvey.can_transition_to(&SurveyScheduled));
        assert!(SurveyScheduled.can_transition_to(&SurveyComplete));
        assert!(SurveyComplete.can_transition_to(&Approved));
        assert!(Approved.can_transition_to(&Active));
    }

    #[test]
    fn cannot_skip_survey() {
        use CustomerStatus::*;
        assert!(!PendingSurvey.can_transition_to(&Active));
        assert!(!SurveyScheduled.can_transition_to(&Approved));
    }

    #[test]
    fn terminated_is_terminal() {
        assert!(CustomerStatus::Terminated.is_terminal());
    }

    #[test]
    fn new_customer_rejects_bad_email() {
        assert!(NewCustomer::new("Jane", "not-an-email", "0812", None).is_err());
        assert!(NewCustomer::new("", "jane@example.com", "0812", None).is_err());
        assert!(NewCustomer::new("Jane", "jane@example.com", "0812", None).is_ok());
    }

    #[test]
    fn suspension_is_reversible() {
        let mut customer = Customer::from_parts(
            CustomerId::from_i64(1),
            NewCustomer::new("Jane", "jane@example.com", "0812", None).unwrap(),
            CustomerStatus::Active,
            Timestamp::now(),
        );
        customer.set_status(CustomerStatus::Suspended).unwrap();
        customer.set_status(CustomerStatus::Active).unwrap();
        assert_eq!(customer.status, CustomerStatus::Active);
    }
}
