//! Adapter availability probing

use async_trait::async_trait;

/// Answers whether an adapter is currently degraded. Wired to the circuit
/// breaker and rate limiter state of the adapter layer at startup.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// True when the adapter should not be preferred right now
    async fn is_degraded(&self, tenant_id: &str, adapter_id: &str) -> bool;
}

/// Probe that reports every adapter healthy (tests, single-rail setups)
pub struct AlwaysAvailable;

#[async_trait]
impl AvailabilityProbe for AlwaysAvailable {
    async fn is_degraded(&self, _tenant_id: &str, _adapter_id: &str) -> bool {
        false
    }
}
