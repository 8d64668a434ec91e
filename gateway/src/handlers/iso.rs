//! pain.001 ingress
//!
//! One canonical payment per `CdtTrfTxInf`; each transaction is accepted
//! under a derived idempotency key so replays of the whole file stay
//! idempotent per transaction.

use crate::acceptance::{accept as do_accept, AcceptOutcome, CanonicalPaymentRequest};
use crate::error::ApiError;
use crate::handlers::payments::AcceptResponse;
use crate::handlers::{idempotency_key_from_headers, tenant_from_headers};
use crate::metrics::ISO_MESSAGES_TOTAL;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use event_bus::topics;
use iso20022::pain001;
use tenant_config::ResponseMode;
use tracing::info;

/// `POST /iso20022/pain001`
pub async fn pain001(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<Vec<AcceptResponse>>), ApiError> {
    ISO_MESSAGES_TOTAL.with_label_values(&["pain.001"]).inc();
    let tenant = tenant_from_headers(&headers)?;
    let file_key = idempotency_key_from_headers(&headers)?;

    let document = pain001::parse(&body)?;
    let instructions = pain001::to_instructions(&document)?;
    info!(
        tenant_id = %tenant.tenant_id,
        transactions = instructions.len(),
        "Received pain.001"
    );

    let mut responses = Vec::with_capacity(instructions.len());
    for instruction in instructions {
        let request = CanonicalPaymentRequest {
            payment_type: instruction
                .local_instrument
                .clone()
                .unwrap_or_else(|| "RTP".to_string()),
            amount: instruction.amount.amount.to_string(),
            currency: instruction.amount.currency.as_str().to_string(),
            debtor_account: instruction.debtor_account.clone(),
            creditor_account: instruction.creditor_account.clone(),
            debtor_bic: instruction.debtor_bic.clone(),
            creditor_bic: instruction.creditor_bic.clone(),
            local_instrument: instruction.local_instrument.clone(),
            end_to_end_id: Some(instruction.end_to_end_id.clone()),
            message_id: Some(instruction.message_id.clone()),
            uetr: instruction.uetr.as_ref().map(|u| u.as_str().to_string()),
        };

        let key = format!("{}:{}", file_key, instruction.end_to_end_id);
        let outcome = do_accept(&state, &tenant, &key, request).await?;
        responses.push(match outcome {
            AcceptOutcome::Replay(payment) => AcceptResponse {
                payment_id: payment.payment_id.to_string(),
                uetr: payment.uetr.as_str().to_string(),
                status: format!("{}", payment.status),
                pain002: None,
                kafka_topic_name: None,
            },
            AcceptOutcome::Accepted {
                payment,
                response_mode,
                snapshot,
                ..
            } => {
                let kafka_topic_name = match response_mode {
                    ResponseMode::KafkaTopic => Some(
                        snapshot
                            .config
                            .payment_type(payment.payment_type.as_str())
                            .ok()
                            .and_then(|pt| {
                                pt.kafka_response
                                    .as_ref()
                                    .and_then(|k| k.topic_override.clone())
                            })
                            .unwrap_or_else(|| {
                                topics::response_topic(&tenant.tenant_id, &payment.payment_type)
                            }),
                    ),
                    _ => None,
                };
                AcceptResponse {
                    payment_id: payment.payment_id.to_string(),
                    uetr: payment.uetr.as_str().to_string(),
                    status: "ACCEPTED_FOR_PROCESSING".to_string(),
                    pain002: None,
                    kafka_topic_name,
                }
            }
        });
    }

    Ok((StatusCode::ACCEPTED, Json(responses)))
}
