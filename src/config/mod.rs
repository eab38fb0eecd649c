//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `NETBILL` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use netbill::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod billing;
mod database;
mod error;
mod gateway;
mod server;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::{DuitkuConfig, GatewayConfig, MidtransConfig, XenditConfig, KNOWN_GATEWAYS};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the NetBill backend.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Billing cycle configuration (due offset, isolation grace period)
    #[serde(default)]
    pub billing: BillingConfig,

    /// Payment gateway credentials and default selector
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `NETBILL` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `NETBILL__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `NETBILL__DATABASE__URL=...` -> `database.url = ...`
    /// - `NETBILL__GATEWAY__MIDTRANS__SERVER_KEY=...` -> `gateway.midtrans.server_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("NETBILL")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Performs semantic validation of configuration:
    /// - URL formats and pool size constraints
    /// - Billing cycle bounds
    /// - Gateway credential presence for the default gateway
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.billing.validate()?;
        self.gateway.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set environment variables for testing
    /// Uses double underscores to separate nested config values
    fn set_minimal_env() {
        env::set_var("NETBILL__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("NETBILL__GATEWAY__DEFAULT_GATEWAY", "midtrans");
        env::set_var(
            "NETBILL__GATEWAY__MIDTRANS__SERVER_KEY",
            "SB-Mid-server-test",
        );
        env::set_var("NETBILL__GATEWAY__MIDTRANS__SANDBOX", "true");
    }

    /// Helper to clear environment variables after testing
    fn clear_env() {
        env::remove_var("NETBILL__DATABASE__URL");
        env::remove_var("NETBILL__GATEWAY__DEFAULT_GATEWAY");
        env::remove_var("NETBILL__GATEWAY__MIDTRANS__SERVER_KEY");
        env::remove_var("NETBILL__GATEWAY__MIDTRANS__SANDBOX");
        env::remove_var("NETBILL__SERVER__PORT");
        env::remove_var("NETBILL__BILLING__GRACE_PERIOD_DAYS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.gateway.default_gateway, "midtrans");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok());
        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_billing_defaults_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.billing.due_days, 7);
        assert_eq!(config.billing.grace_period_days, 5);
    }
}
