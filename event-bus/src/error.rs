//! Error types for the event bus

use thiserror::Error;

/// Result type for bus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bus errors
#[derive(Debug, Error)]
pub enum Error {
    /// Broker connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Publish failure after retries
    #[error("Publish error: {0}")]
    Publish(String),

    /// Subscribe failure
    #[error("Subscribe error: {0}")]
    Subscribe(String),

    /// Envelope encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbox store failure
    #[error("Store error: {0}")]
    Store(#[from] store::Error),
}
