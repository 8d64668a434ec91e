//! Step contract

use crate::{CompensationOutcome, StepOutcome};
use adapters::{AdapterRegistry, FraudClient, LedgerClient};
use async_trait::async_trait;
use payment_core::{Payment, PaymentStatus, ReasonCode, Saga};
use routing::RoutingResolver;
use std::sync::Arc;
use store::{ClearingResultStore, OutboxEvent, PaymentStore, SagaStore};
use tenant_config::{ConfigStore, VersionedTenantConfig};

/// Shared collaborators every step may use
pub struct EngineDeps {
    /// Payment aggregate store
    pub payments: Arc<dyn PaymentStore>,
    /// Saga aggregate store
    pub sagas: Arc<dyn SagaStore>,
    /// Inbound clearing results
    pub clearing_results: Arc<dyn ClearingResultStore>,
    /// Versioned tenant config
    pub config: Arc<ConfigStore>,
    /// Ledger adapter
    pub ledger: Arc<dyn LedgerClient>,
    /// Fraud adapter
    pub fraud: Arc<dyn FraudClient>,
    /// Clearing adapters
    pub adapters: Arc<AdapterRegistry>,
    /// Routing resolver
    pub resolver: Arc<RoutingResolver>,
}

/// Mutable view a step executes against. Saga and payment changes made here
/// are persisted by the engine together with the step outcome; events pushed
/// to `pending_events` ride in that same transaction.
pub struct StepContext<'a> {
    /// The payment being driven
    pub payment: &'a mut Payment,
    /// The saga row
    pub saga: &'a mut Saga,
    /// Execution attempt for this invocation, 1-based
    pub attempt: u32,
    /// Tenant config pinned at the payment's config version
    pub config: Arc<VersionedTenantConfig>,
    /// Engine collaborators
    pub deps: &'a EngineDeps,
    /// Outbox events persisted with the step outcome
    pub pending_events: &'a mut Vec<OutboxEvent>,
}

impl StepContext<'_> {
    /// Idempotency key for a side-effectful downstream call from this step.
    /// Keyed by (payment, step) so a replayed execution hits the same key.
    pub fn idempotency_key(&self, step_name: &str) -> String {
        format!("{}:{}", self.payment.payment_id, step_name)
    }

    /// Apply a payment status transition and queue the matching event
    pub fn transition_payment(
        &mut self,
        status: PaymentStatus,
        reason: Option<ReasonCode>,
        event_topic: Option<&str>,
    ) -> crate::Result<()> {
        if self.payment.status == status {
            return Ok(());
        }
        self.payment.transition(status)?;
        if let Some(reason) = reason {
            self.payment.failure_reason = Some(reason);
        }
        if let Some(topic) = event_topic {
            self.pending_events.push(OutboxEvent::new(
                topic,
                self.payment.payment_id.to_string(),
                self.payment.tenant.tenant_id.clone(),
                serde_json::json!({
                    "paymentId": self.payment.payment_id.to_string(),
                    "uetr": self.payment.uetr.as_str(),
                    "status": format!("{}", status),
                    "reason": reason.map(|r| r.as_str()),
                }),
            ));
        }
        Ok(())
    }
}

/// One saga step. Both operations are idempotent for the same
/// `(saga_id, step_name, attempt)`.
#[async_trait]
pub trait SagaStep: Send + Sync {
    /// Step name; stable, recorded in [`payment_core::StepState`]
    fn name(&self) -> &'static str;

    /// Whether the step talks to a clearing rail (affects the retry budget)
    fn rail_bound(&self) -> bool {
        false
    }

    /// Execute the step forward
    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome;

    /// Undo the step after a later terminal failure. Steps without side
    /// effects return `Succeeded` immediately.
    async fn compensate(&self, ctx: &mut StepContext<'_>) -> CompensationOutcome;
}
