//! Ledger posting step

use crate::{outcome::outcome_from_adapter_error, CompensationOutcome, SagaStep, StepContext, StepOutcome};
use async_trait::async_trait;
use payment_core::{PaymentStatus, ReasonCode};

/// `post_ledger` step: finalize the debit/credit pair once clearing
/// accepted. Compensation writes the reversing entry.
pub struct PostLedger;

#[async_trait]
impl SagaStep for PostLedger {
    fn name(&self) -> &'static str {
        "post_ledger"
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let key = ctx.idempotency_key(self.name());
        if let Err(e) = ctx.deps.ledger.post(ctx.payment, &key).await {
            return outcome_from_adapter_error(&e);
        }

        if let Err(e) = ctx.transition_payment(PaymentStatus::Settled, None, None) {
            return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string());
        }
        StepOutcome::Succeeded
    }

    async fn compensate(&self, ctx: &mut StepContext<'_>) -> CompensationOutcome {
        let key = ctx.idempotency_key(self.name());
        match ctx.deps.ledger.reverse(ctx.payment, &key).await {
            Ok(()) => CompensationOutcome::Succeeded,
            Err(e) => CompensationOutcome::Retryable(e.reason().to_string()),
        }
    }
}
