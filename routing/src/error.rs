//! Error types for routing

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Routing errors
#[derive(Error, Debug)]
pub enum Error {
    /// No adapter candidate could be produced for the payment
    #[error("No route for tenant {tenant_id}, payment type {payment_type}")]
    NoRoute {
        /// Tenant
        tenant_id: String,
        /// Payment type
        payment_type: String,
    },
}
