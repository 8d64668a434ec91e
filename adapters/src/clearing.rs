//! Clearing adapter contract

use crate::{Error, Result};
use async_trait::async_trait;
use iso20022::camt::CancelOutcome;
use payment_core::Payment;
use std::collections::HashMap;
use std::sync::Arc;
use tenant_config::Rail;
use tokio::sync::RwLock;

/// What a rail supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the rail accepts cancel/recall (camt.055/camt.056)
    pub supports_cancel: bool,
    /// Whether `submit` returns the final status in the same call
    pub synchronous: bool,
}

/// Result of a clearing submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearingOutcome {
    /// Rail reported final settlement in the submit call
    Settled,
    /// Rail accepted; the final status arrives via a UETR-keyed callback
    Accepted {
        /// Rail-side tracking reference
        tracking_ref: String,
    },
    /// Business rejection (NACK)
    Rejected {
        /// Rail reason code, mapped into pain.002 downstream
        reason_code: String,
    },
}

/// One clearing rail connection
#[async_trait]
pub trait ClearingAdapter: Send + Sync {
    /// Adapter id (unique per tenant)
    fn adapter_id(&self) -> &str;

    /// The rail behind this adapter
    fn rail(&self) -> Rail;

    /// Rail capabilities
    fn capabilities(&self) -> Capabilities;

    /// Submit a payment to the rail
    async fn submit(&self, payment: &Payment) -> Result<ClearingOutcome>;

    /// Cancel a previously submitted payment. Callers must check
    /// [`Capabilities::supports_cancel`] first.
    async fn cancel(&self, payment: &Payment) -> Result<CancelOutcome>;

    /// Poll the rail for the current status
    async fn poll(&self, payment: &Payment) -> Result<ClearingOutcome>;
}

/// Registry of constructed adapters, keyed by (tenant, adapter id)
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn ClearingAdapter>>>,
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn key(tenant_id: &str, adapter_id: &str) -> String {
        format!("{}:{}", tenant_id, adapter_id)
    }

    /// Register an adapter for a tenant
    pub async fn register(&self, tenant_id: &str, adapter: Arc<dyn ClearingAdapter>) {
        let mut adapters = self.adapters.write().await;
        adapters.insert(Self::key(tenant_id, adapter.adapter_id()), adapter);
    }

    /// Look up an adapter
    pub async fn get(&self, tenant_id: &str, adapter_id: &str) -> Result<Arc<dyn ClearingAdapter>> {
        let adapters = self.adapters.read().await;
        adapters
            .get(&Self::key(tenant_id, adapter_id))
            .cloned()
            .ok_or_else(|| {
                Error::Config(format!(
                    "no adapter {} registered for tenant {}",
                    adapter_id, tenant_id
                ))
            })
    }
}
