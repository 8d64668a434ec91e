//! Error types for the domain model

use thiserror::Error;

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Amount is negative or otherwise malformed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is not a known ISO 4217 code
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// UETR is malformed
    #[error("Invalid UETR: {0}")]
    InvalidUetr(String),

    /// Status transition not permitted by the payment state machine
    #[error("Invalid payment status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Required field missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),
}
