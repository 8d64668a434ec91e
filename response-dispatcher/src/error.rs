//! Error types for the response dispatcher

use thiserror::Error;

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Dispatcher errors
#[derive(Error, Debug)]
pub enum Error {
    /// No callback URL configured for a tenant in Asynchronous mode
    #[error("Tenant {0} has no callback configured")]
    CallbackMissing(String),

    /// Callback delivery failed after retries; the response was dead-lettered
    #[error("Callback delivery to {url} failed after {attempts} attempts: {last_error}")]
    CallbackExhausted {
        /// Target URL
        url: String,
        /// Attempts made
        attempts: u32,
        /// Final error
        last_error: String,
    },

    /// pain.002 serialization failure
    #[error("ISO 20022 error: {0}")]
    Iso20022(#[from] iso20022::Error),

    /// Topic publish failure
    #[error("Bus error: {0}")]
    Bus(#[from] event_bus::Error),

    /// Config lookup failure
    #[error("Config error: {0}")]
    Config(#[from] tenant_config::Error),

    /// JSON encode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
