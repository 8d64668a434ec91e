//! Error types for the saga engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Saga not found
    #[error("Saga not found: {0}")]
    SagaNotFound(String),

    /// Payment backing the saga not found (invariant violation)
    #[error("Payment {payment_id} missing for saga {saga_id}")]
    PaymentMissing {
        /// Saga
        saga_id: String,
        /// Payment
        payment_id: String,
    },

    /// Store failure
    #[error("Store error: {0}")]
    Store(#[from] store::Error),

    /// Config store failure
    #[error("Config error: {0}")]
    Config(#[from] tenant_config::Error),

    /// Domain invariant violation
    #[error("Domain error: {0}")]
    Domain(#[from] payment_core::Error),
}
