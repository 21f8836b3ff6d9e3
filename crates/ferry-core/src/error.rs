//! Error types for Ferry

use thiserror::Error;

use crate::identity::HostId;
use crate::message::MessageId;

/// Top-level error type for Ferry
#[derive(Debug, Error)]
pub enum FerryError {
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by routing strategies
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A message carries metadata belonging to a different strategy
    #[error("Contract violation for message {message}: expected {expected} metadata, found {found}")]
    ContractViolation {
        message: MessageId,
        expected: &'static str,
        found: &'static str,
    },

    /// A host address lies outside the known host population
    #[error("Host {host} outside population of {population} hosts")]
    HostOutOfRange { host: HostId, population: usize },

    /// The node context has no strategy registered for a host
    #[error("No routing strategy registered for host {0}")]
    NoStrategy(HostId),
}

/// Errors raised while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {namespace}.{key}")]
    MissingRequired { namespace: String, key: String },

    #[error("Invalid value for {namespace}.{key}: {reason}")]
    InvalidValue {
        namespace: String,
        key: String,
        reason: String,
    },

    #[error("Settings parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create a missing-setting error
    pub fn missing(namespace: &str, key: &str) -> Self {
        Self::MissingRequired {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    /// Create an invalid-value error
    pub fn invalid(namespace: &str, key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            namespace: namespace.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Ferry operations
pub type FerryResult<T> = Result<T, FerryError>;
