//! Error types for the config store

use thiserror::Error;

/// Result type for config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Config store errors
#[derive(Error, Debug)]
pub enum Error {
    /// Tenant is not registered
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// Tenant exists but is not ACTIVE
    #[error("Tenant not active: {0}")]
    TenantInactive(String),

    /// Payment type not configured for the tenant
    #[error("Payment type not configured: {tenant_id}/{code}")]
    PaymentTypeNotFound {
        /// Tenant
        tenant_id: String,
        /// Payment type code
        code: String,
    },

    /// Clearing adapter not configured for the tenant
    #[error("Clearing adapter not configured: {tenant_id}/{adapter_id}")]
    AdapterNotFound {
        /// Tenant
        tenant_id: String,
        /// Adapter id
        adapter_id: String,
    },

    /// Requested config version was never recorded
    #[error("Config version {version} not found for tenant {tenant_id}")]
    VersionNotFound {
        /// Tenant
        tenant_id: String,
        /// Version
        version: u64,
    },

    /// Config file parse failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// File read failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
