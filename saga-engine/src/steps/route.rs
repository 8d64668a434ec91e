//! Routing step

use crate::{CompensationOutcome, SagaStep, StepContext, StepOutcome};
use async_trait::async_trait;
use payment_core::{Currency, PaymentStatus, ReasonCode};
use routing::RoutingRequest;
use tracing::info;

/// `route` step: resolve the ranked clearing adapter candidates once; the
/// submit step walks the list on adapter unavailability
pub struct Route;

fn is_cross_border(payment: &payment_core::Payment) -> bool {
    if payment.amount.currency != Currency::ZAR {
        return true;
    }
    payment
        .creditor
        .agent_bic
        .as_deref()
        .map(|bic| bic.len() >= 6 && &bic[4..6] != "ZA")
        .unwrap_or(false)
}

#[async_trait]
impl SagaStep for Route {
    fn name(&self) -> &'static str {
        "route"
    }

    async fn execute(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let request = RoutingRequest {
            tenant_id: ctx.payment.tenant.tenant_id.clone(),
            payment_type: ctx.payment.payment_type.as_str().to_string(),
            local_instrument: ctx.payment.local_instrument.clone(),
            amount: ctx.payment.amount,
            cross_border: is_cross_border(ctx.payment),
        };

        let decision = match ctx.deps.resolver.resolve(&ctx.config.config, &request).await {
            Ok(decision) => decision,
            Err(e) => return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string()),
        };

        info!(
            payment_id = %ctx.payment.payment_id,
            candidates = ?decision.candidates,
            "Routed payment"
        );
        ctx.saga.route_candidates = decision.candidates;
        ctx.saga.route_position = 0;

        if let Err(e) = ctx.transition_payment(PaymentStatus::Routed, None, None) {
            return StepOutcome::Terminal(ReasonCode::SystemError, e.to_string());
        }
        StepOutcome::Succeeded
    }

    async fn compensate(&self, _ctx: &mut StepContext<'_>) -> CompensationOutcome {
        // Routing has no side effects
        CompensationOutcome::Succeeded
    }
}
