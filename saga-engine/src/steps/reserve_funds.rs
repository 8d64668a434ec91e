//! Funds reservation step

use crate::{outcome::outcome_from_adapter_error, CompensationOutcome, SagaStep, StepContext, StepOutcome};
use async_trait::async_trait;
use payment_core::{PaymentStatus, ReasonCode};

/// `reserve_funds` step: hold on the debtor account, keyed by
/// `(payment_id, step)` so replays land on the same ledger entry
pub struct ReserveFunds;

#[async_trait]
impl SagaStep for ReserveFunds {
    fn name(&self) -> &'static str {
        "reserve_funds"
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let key = ctx.idempotency_key(self.name());
        if let Err(e) = ctx.deps.ledger.place_hold(ctx.payment, &key).await {
            return outcome_from_adapter_error(&e);
        }

        if let Err(e) = ctx.transition_payment(PaymentStatus::FundsReserved, None, None) {
            return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string());
        }
        StepOutcome::Succeeded
    }

    async fn compensate(&self, ctx: &mut StepContext<'_>) -> CompensationOutcome {
        // Same key as the hold; the ledger release is idempotent on it
        let key = ctx.idempotency_key(self.name());
        match ctx.deps.ledger.release_hold(ctx.payment, &key).await {
            Ok(()) => CompensationOutcome::Succeeded,
            Err(e) if e.is_retryable() => CompensationOutcome::Retryable(e.reason().to_string()),
            Err(e) => CompensationOutcome::Retryable(e.to_string()),
        }
    }
}
