//! Tenant context threaded through every operation
//!
//! There is no ambient tenant state anywhere in the engine: every repository
//! call and every outbound adapter call takes this value explicitly.

use serde::{Deserialize, Serialize};

/// Tenant scope for a request or aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    /// Tenant identifier (a bank or fintech on the platform)
    pub tenant_id: String,

    /// Business unit within the tenant
    pub business_unit_id: Option<String>,

    /// End customer of the tenant
    pub customer_id: Option<String>,
}

impl TenantContext {
    /// Create a context scoped to a tenant only
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            business_unit_id: None,
            customer_id: None,
        }
    }

    /// Set business unit
    pub fn with_business_unit(mut self, business_unit_id: impl Into<String>) -> Self {
        self.business_unit_id = Some(business_unit_id.into());
        self
    }

    /// Set customer
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

impl std::fmt::Display for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tenant_id)
    }
}
