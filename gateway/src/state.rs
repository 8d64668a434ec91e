//! Shared application state

use adapters::circuit_breaker::CircuitBreakerManager;
use async_trait::async_trait;
use response_dispatcher::{DeadLetterQueue, ResponseDispatcher};
use routing::AvailabilityProbe;
use saga_engine::SagaEngine;
use std::sync::Arc;
use store::UetrIndex;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Saga engine; its deps carry every store and adapter handle
    pub engine: Arc<SagaEngine>,
    /// UETR reconciliation index for inbound callbacks
    pub uetr_index: Arc<dyn UetrIndex>,
    /// Response dispatcher
    pub dispatcher: Arc<ResponseDispatcher>,
    /// Undeliverable callback responses
    pub response_dlq: Arc<DeadLetterQueue>,
    /// Event bus handle (health reporting and callback signals)
    pub bus: Arc<dyn event_bus::EventBus>,
}

/// Availability probe backed by the adapter layer's circuit breakers.
/// An open circuit makes the candidate degraded for routing.
pub struct CircuitProbe(pub Arc<CircuitBreakerManager>);

#[async_trait]
impl AvailabilityProbe for CircuitProbe {
    async fn is_degraded(&self, _tenant_id: &str, adapter_id: &str) -> bool {
        self.0.is_open(adapter_id).await
    }
}
