//! Billing cycle configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Billing configuration (invoice scheduling and isolation policy)
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Days between invoice_date and due_date for generated invoices
    #[serde(default = "default_due_days")]
    pub due_days: u32,

    /// Days past due_date before an overdue service becomes eligible
    /// for isolation
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.due_days == 0 || self.due_days > 60 {
            return Err(ValidationError::InvalidDueDays);
        }
        if self.grace_period_days > 90 {
            return Err(ValidationError::InvalidGracePeriod);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            due_days: default_due_days(),
            grace_period_days: default_grace_period_days(),
        }
    }
}

fn default_due_days() -> u32 {
    7
}

fn default_grace_period_days() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(BillingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_due_days_rejected() {
        let config = BillingConfig {
            due_days: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDueDays)
        ));
    }

    #[test]
    fn test_excessive_grace_period_rejected() {
        let config = BillingConfig {
            grace_period_days: 120,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidGracePeriod)
        ));
    }
}
