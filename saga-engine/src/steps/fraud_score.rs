//! Fraud scoring step
//!
//! Runs only when the tenant's fraud toggle resolves to enabled for this
//! (payment type, local instrument, clearing hint) scope.

use crate::{outcome::outcome_from_adapter_error, CompensationOutcome, SagaStep, StepContext, StepOutcome};
use async_trait::async_trait;
use payment_core::ReasonCode;
use tracing::info;

/// `fraud_score` step
pub struct FraudScore;

#[async_trait]
impl SagaStep for FraudScore {
    fn name(&self) -> &'static str {
        "fraud_score"
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let enabled = ctx.config.config.fraud.resolve(
            ctx.payment.payment_type.as_str(),
            ctx.payment.local_instrument.as_deref(),
            ctx.saga.clearing_adapter_id.as_deref(),
        );
        if !enabled {
            return StepOutcome::Skipped("fraud_disabled".to_string());
        }

        let score = match ctx.deps.fraud.score(ctx.payment).await {
            Ok(score) => score,
            Err(e) => return outcome_from_adapter_error(&e),
        };

        let threshold = ctx.deps.fraud.threshold();
        if score.is_rejected(threshold) {
            return StepOutcome::Terminal(
                ReasonCode::FraudRejected,
                format!("score {} >= threshold {}", score.score, threshold),
            );
        }

        info!(
            payment_id = %ctx.payment.payment_id,
            score = score.score,
            "Fraud check passed"
        );
        StepOutcome::Succeeded
    }

    async fn compensate(&self, _ctx: &mut StepContext<'_>) -> CompensationOutcome {
        // Scoring has no side effects
        CompensationOutcome::Succeeded
    }
}
