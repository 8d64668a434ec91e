//! Error types for the persistence layer

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Store errors
#[derive(Error, Debug)]
pub enum Error {
    /// Uniqueness violation (idempotency key, UETR)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A persist was attempted after the advancement lease moved on
    #[error("Lease lost for saga {0}")]
    LeaseLost(String),

    /// Row encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Database(e.to_string())
    }
}
