//! Notification step
//!
//! Emits the notification/audit events for the completed payment. Always
//! best-effort: this step never fails the saga.

use crate::{CompensationOutcome, SagaStep, StepContext, StepOutcome};
use async_trait::async_trait;
use store::OutboxEvent;

/// `notify` step
pub struct Notify;

#[async_trait]
impl SagaStep for Notify {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        ctx.pending_events.push(OutboxEvent::new(
            "payment.notification.v1",
            ctx.payment.payment_id.to_string(),
            ctx.payment.tenant.tenant_id.clone(),
            serde_json::json!({
                "paymentId": ctx.payment.payment_id.to_string(),
                "uetr": ctx.payment.uetr.as_str(),
                "status": format!("{}", ctx.payment.status),
                "amount": ctx.payment.amount.amount.to_string(),
                "currency": ctx.payment.amount.currency.as_str(),
            }),
        ));
        StepOutcome::Succeeded
    }

    async fn compensate(&self, _ctx: &mut StepContext<'_>) -> CompensationOutcome {
        CompensationOutcome::Succeeded
    }
}
