//! Response delivery worker
//!
//! Consumes terminal payment events and delivers the pain.002 for
//! asynchronous and topic response modes. Synchronous payments got their
//! response on the open accept request; the worker skips them.

use crate::state::AppState;
use event_bus::{topics, EventEnvelope};
use futures::StreamExt;
use payment_core::{PaymentId, TenantContext};
use tenant_config::ResponseMode;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Run until the shutdown signal fires
pub async fn run(state: AppState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let completed = match state.bus.subscribe(topics::PAYMENT_COMPLETED).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Response worker could not subscribe: {}", e);
            return;
        }
    };
    let failed = match state.bus.subscribe(topics::PAYMENT_FAILED).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Response worker could not subscribe: {}", e);
            return;
        }
    };
    let mut terminal = futures::stream::select(completed, failed);

    info!("Response worker started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Response worker stopping");
                return;
            }
            message = terminal.next() => {
                let Some(message) = message else { return };
                let envelope = match EventEnvelope::from_bytes(&message.payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!("Undecodable terminal event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = handle_terminal(&state, &envelope).await {
                    error!(
                        aggregate_id = %envelope.aggregate_id,
                        "Response dispatch failed: {}", e
                    );
                }
            }
        }
    }
}

async fn handle_terminal(state: &AppState, envelope: &EventEnvelope) -> anyhow::Result<()> {
    let tenant = TenantContext::new(envelope.tenant_id.clone());
    let payment_id = PaymentId(Uuid::parse_str(&envelope.aggregate_id)?);

    let deps = state.engine.deps();
    let Some(payment) = deps.payments.get(&tenant, payment_id).await? else {
        warn!(payment_id = %payment_id, "Terminal event for unknown payment");
        return Ok(());
    };

    // Read the mode from the snapshot the payment pinned at acceptance
    let snapshot = deps
        .config
        .at_version(&tenant.tenant_id, payment.config_version)
        .await?;
    let mode = snapshot
        .config
        .payment_type(payment.payment_type.as_str())?
        .response_mode;
    if mode == ResponseMode::Synchronous {
        return Ok(());
    }

    state.dispatcher.dispatch(&payment, &snapshot).await?;
    Ok(())
}
