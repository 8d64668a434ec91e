//! Error types for the ISO 20022 codec

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codec errors
#[derive(Error, Debug)]
pub enum Error {
    /// XML parse or write failure
    #[error("XML error: {0}")]
    Xml(String),

    /// A field the engine requires is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Field present but malformed
    #[error("Invalid field {field}: {detail}")]
    InvalidField {
        /// Element name
        field: &'static str,
        /// What was wrong
        detail: String,
    },

    /// Domain-level rejection (amount, currency, UETR)
    #[error("Domain error: {0}")]
    Domain(#[from] payment_core::Error),
}
