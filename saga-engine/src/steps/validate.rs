//! Business validation step
//!
//! Structural validation already happened at acceptance; this step applies
//! tenant policy (limits, blocked counterparties) against the pinned config
//! version so it can run under the saga's retry umbrella.

use crate::{CompensationOutcome, SagaStep, StepContext, StepOutcome};
use async_trait::async_trait;
use event_bus::topics;
use payment_core::{PaymentStatus, ReasonCode};

/// `validate` step
pub struct Validate;

#[async_trait]
impl SagaStep for Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let config = &ctx.config.config;

        let payment_type = match config.payment_type(ctx.payment.payment_type.as_str()) {
            Ok(pt) => pt,
            Err(e) => return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string()),
        };

        if let Some(max_amount) = payment_type.max_amount {
            if ctx.payment.amount.amount > max_amount {
                return StepOutcome::Terminal(
                    ReasonCode::OverLimit,
                    format!("amount {} over limit {}", ctx.payment.amount.amount, max_amount),
                );
            }
        }

        if config
            .blocked_counterparties
            .contains(&ctx.payment.creditor.account)
        {
            return StepOutcome::Terminal(
                ReasonCode::BlockedCounterparty,
                format!("creditor {} is blocked", ctx.payment.creditor.account),
            );
        }

        if let Err(e) = ctx.transition_payment(
            PaymentStatus::Validated,
            None,
            Some(topics::PAYMENT_VALIDATED),
        ) {
            return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string());
        }
        StepOutcome::Succeeded
    }

    async fn compensate(&self, _ctx: &mut StepContext<'_>) -> CompensationOutcome {
        // No side effects
        CompensationOutcome::Succeeded
    }
}
