//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invoice due offset must be between 1 and 60 days")]
    InvalidDueDays,

    #[error("Isolation grace period must not exceed 90 days")]
    InvalidGracePeriod,

    #[error("Default gateway '{0}' is not a known gateway identifier")]
    UnknownDefaultGateway(String),

    #[error("Default gateway '{0}' has no credentials configured")]
    DefaultGatewayNotConfigured(String),

    #[error("Gateway credential is empty: {0}")]
    EmptyGatewayCredential(&'static str),
}
