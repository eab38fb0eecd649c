//! State machine trait for lifecycle status enums.
//!
//! Customer, service, invoice, and payment statuses all follow fixed
//! transition tables. Implementing this trait gives each of them validated
//! transitions with a uniform error shape.

use super::{DomainError, ErrorCode};

/// Trait for status enums that represent state machines.
///
/// Implementors define the transition table; validated transition methods
/// come for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Draft,
        Issued,
        Settled,
        Voided,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use TestStatus::*;
            matches!(
                (self, target),
                (Draft, Issued) | (Issued, Settled) | (Issued, Voided)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use TestStatus::*;
            match self {
                Draft => vec![Issued],
                Issued => vec![Settled, Voided],
                Settled => vec![],
                Voided => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        let result = TestStatus::Draft.transition_to(TestStatus::Issued);
        assert_eq!(result.unwrap(), TestStatus::Issued);
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let result = TestStatus::Draft.transition_to(TestStatus::Settled);
        assert!(matches!(
            result,
            Err(DomainError {
                code: ErrorCode::InvalidStateTransition,
                ..
            })
        ));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(TestStatus::Settled.is_terminal());
        assert!(TestStatus::Voided.is_terminal());
        assert!(!TestStatus::Issued.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for status in [
            TestStatus::Draft,
            TestStatus::Issued,
            TestStatus::Settled,
            TestStatus::Voided,
        ] {
            for target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&target),
                    "{:?} -> {:?} should be valid",
                    status,
                    target
                );
            }
        }
    }
}
