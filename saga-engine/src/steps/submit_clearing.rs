//! Clearing submission step
//!
//! Submits to the current routing candidate. An unavailability failure
//! advances to the next candidate before the retry, so failover never
//! re-runs routing; business rejections never fail over.

use crate::{CompensationOutcome, SagaStep, StepContext, StepOutcome};
use adapters::ClearingOutcome;
use async_trait::async_trait;
use chrono::Utc;
use event_bus::topics;
use iso20022::camt::CancelOutcome;
use payment_core::{PaymentStatus, ReasonCode};
use store::{ClearingResultRecord, OutboxEvent};
use tracing::{info, warn};

/// `submit_clearing` step
pub struct SubmitToClearing;

impl SubmitToClearing {
    fn current_candidate(ctx: &StepContext<'_>) -> Option<String> {
        ctx.saga
            .route_candidates
            .get(ctx.saga.route_position)
            .cloned()
    }
}

#[async_trait]
impl SagaStep for SubmitToClearing {
    fn name(&self) -> &'static str {
        "submit_clearing"
    }

    fn rail_bound(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let adapter_id = match Self::current_candidate(ctx) {
            Some(id) => id,
            None => {
                return StepOutcome::Terminal(
                    ReasonCode::SystemError,
                    "no routing candidate left".to_string(),
                )
            }
        };

        let adapter = match ctx
            .deps
            .adapters
            .get(&ctx.payment.tenant.tenant_id, &adapter_id)
            .await
        {
            Ok(adapter) => adapter,
            Err(e) => return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string()),
        };

        ctx.saga.clearing_adapter_id = Some(adapter_id.clone());
        match adapter.submit(ctx.payment).await {
            Ok(outcome) => {
                if let Err(e) = ctx.transition_payment(
                    PaymentStatus::ClearingSubmitted,
                    None,
                    Some(topics::TRANSACTION_CREATED),
                ) {
                    return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string());
                }
                match outcome {
                    ClearingOutcome::Settled => {
                        // Synchronous rail: record the final result so the
                        // await step completes on its first execution
                        let record = ClearingResultRecord {
                            uetr: ctx.payment.uetr.clone(),
                            tenant_id: ctx.payment.tenant.tenant_id.clone(),
                            accepted: true,
                            rail_status: "ACSC".to_string(),
                            reason_code: None,
                            received_at: Utc::now(),
                        };
                        if let Err(e) = ctx.deps.clearing_results.put_result(record).await {
                            return StepOutcome::Retryable(e.to_string());
                        }
                        StepOutcome::Succeeded
                    }
                    ClearingOutcome::Accepted { tracking_ref } => {
                        info!(
                            payment_id = %ctx.payment.payment_id,
                            adapter_id,
                            tracking_ref,
                            "Clearing accepted; awaiting rail callback"
                        );
                        ctx.saga.tracking_ref = Some(tracking_ref);
                        StepOutcome::Succeeded
                    }
                    ClearingOutcome::Rejected { reason_code } => StepOutcome::Terminal(
                        ReasonCode::ClearingRejected,
                        format!("rail NACK {}", reason_code),
                    ),
                }
            }
            Err(e) if e.is_retryable() => {
                // Adapter unavailable: move to the next routing candidate
                if ctx.saga.route_position + 1 < ctx.saga.route_candidates.len() {
                    warn!(
                        payment_id = %ctx.payment.payment_id,
                        failed_adapter = adapter_id,
                        "Failing over to next routing candidate: {}", e
                    );
                    ctx.saga.route_position += 1;
                }
                StepOutcome::Retryable(e.reason().to_string())
            }
            Err(e) => crate::outcome::outcome_from_adapter_error(&e),
        }
    }

    async fn compensate(&self, ctx: &mut StepContext<'_>) -> CompensationOutcome {
        let adapter_id = match ctx.saga.clearing_adapter_id.clone() {
            Some(id) => id,
            None => return CompensationOutcome::Succeeded,
        };
        let adapter = match ctx
            .deps
            .adapters
            .get(&ctx.payment.tenant.tenant_id, &adapter_id)
            .await
        {
            Ok(adapter) => adapter,
            Err(_) => {
                return CompensationOutcome::Uncancellable("adapter no longer configured".into())
            }
        };

        if !adapter.capabilities().supports_cancel {
            return CompensationOutcome::Uncancellable(format!(
                "rail {} has no recall",
                adapter.rail()
            ));
        }

        match adapter.cancel(ctx.payment).await {
            Ok(CancelOutcome::Cancelled) => {
                ctx.pending_events.push(OutboxEvent::new(
                    topics::TRANSACTION_COMPLETED,
                    ctx.payment.payment_id.to_string(),
                    ctx.payment.tenant.tenant_id.clone(),
                    serde_json::json!({
                        "paymentId": ctx.payment.payment_id.to_string(),
                        "uetr": ctx.payment.uetr.as_str(),
                        "result": "cancelled",
                    }),
                ));
                CompensationOutcome::Succeeded
            }
            Ok(CancelOutcome::Rejected) => {
                CompensationOutcome::Uncancellable("rail refused the recall".into())
            }
            Err(e) if e.is_retryable() => CompensationOutcome::Retryable(e.reason().to_string()),
            Err(e) => CompensationOutcome::Uncancellable(e.to_string()),
        }
    }
}
