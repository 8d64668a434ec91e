//! Error types for adapters

use thiserror::Error;

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter errors
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Circuit breaker open
    #[error("Circuit breaker open for adapter {adapter_id}")]
    CircuitOpen {
        /// Adapter id
        adapter_id: String,
    },

    /// Per-tenant rate limit saturated
    #[error("Rate limited: adapter {adapter_id}, tenant {tenant_id}")]
    RateLimited {
        /// Adapter id
        adapter_id: String,
        /// Tenant
        tenant_id: String,
    },

    /// Timeout
    #[error("Timeout after {millis}ms: {operation}")]
    Timeout {
        /// Elapsed budget
        millis: u64,
        /// Operation
        operation: String,
    },

    /// Downstream returned a non-success HTTP status
    #[error("Downstream API error {status_code}: {message}")]
    BankApi {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason
        message: String,
    },

    /// Ledger reports insufficient funds or hold capacity
    #[error("Insufficient funds on account {account}")]
    InsufficientFunds {
        /// Debtor account
        account: String,
    },

    /// Account unknown or malformed per the ledger
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    /// Payload mapping failure
    #[error("Payload mapping error: {0}")]
    Mapping(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ISO 20022 codec error
    #[error("ISO 20022 error: {0}")]
    Iso20022(#[from] iso20022::Error),
}

impl Error {
    /// Whether the saga should retry (possibly on another routing candidate)
    /// rather than fail terminally
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connection(_)
            | Error::CircuitOpen { .. }
            | Error::RateLimited { .. }
            | Error::Timeout { .. } => true,
            Error::BankApi { status_code, .. } => *status_code >= 500,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Stable reason string recorded in saga step state
    pub fn reason(&self) -> &'static str {
        match self {
            Error::CircuitOpen { .. } => "circuit_open",
            Error::RateLimited { .. } => "rate_limited",
            Error::Timeout { .. } => "timeout",
            Error::Connection(_) | Error::Http(_) => "connection",
            Error::BankApi { status_code, .. } if *status_code >= 500 => "downstream_5xx",
            Error::BankApi { .. } => "downstream_reject",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::InvalidAccount(_) => "invalid_account",
            Error::Mapping(_) | Error::Config(_) | Error::Json(_) | Error::Iso20022(_) => {
                "config_error"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::CircuitOpen { adapter_id: "a".into() }.is_retryable());
        assert!(Error::Timeout { millis: 10, operation: "submit".into() }.is_retryable());
        assert!(Error::BankApi { status_code: 503, message: String::new() }.is_retryable());
        assert!(!Error::BankApi { status_code: 422, message: String::new() }.is_retryable());
        assert!(!Error::InsufficientFunds { account: "A".into() }.is_retryable());
        assert!(!Error::Mapping("bad path".into()).is_retryable());
    }
}
