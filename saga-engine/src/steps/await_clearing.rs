//! Await-clearing-result step
//!
//! Synchronous rails recorded their result during submission and complete
//! on the first execution. Asynchronous rails park here: each execution
//! checks the UETR-keyed result store and reschedules until the inbound
//! pacs.002/camt.054 handler records the outcome.

use crate::{CompensationOutcome, SagaStep, StepContext, StepOutcome};
use async_trait::async_trait;
use event_bus::topics;
use payment_core::{PaymentStatus, ReasonCode};

/// `await_clearing_result` step
pub struct AwaitClearingResult;

#[async_trait]
impl SagaStep for AwaitClearingResult {
    fn name(&self) -> &'static str {
        "await_clearing_result"
    }

    fn rail_bound(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let result = match ctx
            .deps
            .clearing_results
            .get_result(&ctx.payment.tenant, &ctx.payment.uetr)
            .await
        {
            Ok(result) => result,
            Err(e) => return StepOutcome::Retryable(e.to_string()),
        };

        match result {
            None => StepOutcome::Retryable("awaiting_clearing_result".to_string()),
            Some(record) if record.accepted => {
                if let Err(e) = ctx.transition_payment(
                    PaymentStatus::ClearingAccepted,
                    None,
                    Some(topics::TRANSACTION_COMPLETED),
                ) {
                    return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string());
                }
                StepOutcome::Succeeded
            }
            Some(record) => {
                if let Err(e) =
                    ctx.transition_payment(PaymentStatus::ClearingRejected, None, None)
                {
                    return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string());
                }
                StepOutcome::Terminal(
                    ReasonCode::ClearingRejected,
                    format!(
                        "rail status {} reason {}",
                        record.rail_status,
                        record.reason_code.as_deref().unwrap_or("NARR")
                    ),
                )
            }
        }
    }

    async fn compensate(&self, _ctx: &mut StepContext<'_>) -> CompensationOutcome {
        // The correlation row stays for the dedupe window; nothing to undo
        CompensationOutcome::Succeeded
    }
}
