//! Payment acceptance, status and cancel handlers

use crate::acceptance::{accept as do_accept, AcceptOutcome, CanonicalPaymentRequest};
use crate::error::ApiError;
use crate::handlers::{idempotency_key_from_headers, tenant_from_headers};
use crate::metrics::{ACCEPT_DURATION_SECONDS, PAYMENTS_ACCEPTED_TOTAL};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use event_bus::topics;
use iso20022::camt::{self, CancelOutcome};
use payment_core::{Payment, PaymentId};
use response_dispatcher::DispatchResult;
use serde::Serialize;
use std::time::{Duration, Instant};
use tenant_config::ResponseMode;
use uuid::Uuid;

/// Acceptance response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    /// Payment id
    pub payment_id: String,
    /// UETR
    pub uetr: String,
    /// Payment status, or `ACCEPTED_FOR_PROCESSING` for async modes
    pub status: String,
    /// pain.002 XML for synchronous responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain002: Option<String>,
    /// Response topic for KafkaTopic mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_topic_name: Option<String>,
}

fn replay_response(payment: &Payment) -> AcceptResponse {
    AcceptResponse {
        payment_id: payment.payment_id.to_string(),
        uetr: payment.uetr.as_str().to_string(),
        status: format!("{}", payment.status),
        pain002: None,
        kafka_topic_name: None,
    }
}

/// `POST /payments`
pub async fn accept(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CanonicalPaymentRequest>,
) -> Result<(StatusCode, Json<AcceptResponse>), ApiError> {
    let start = Instant::now();
    let tenant = tenant_from_headers(&headers)?;
    let key = idempotency_key_from_headers(&headers)?;

    let outcome = do_accept(&state, &tenant, &key, request).await?;
    match outcome {
        AcceptOutcome::Replay(payment) => {
            PAYMENTS_ACCEPTED_TOTAL
                .with_label_values(&[&tenant.tenant_id, "replay"])
                .inc();
            Ok((StatusCode::OK, Json(replay_response(&payment))))
        }
        AcceptOutcome::Accepted {
            payment,
            saga_id,
            response_mode,
            snapshot,
        } => {
            PAYMENTS_ACCEPTED_TOTAL
                .with_label_values(&[&tenant.tenant_id, "new"])
                .inc();

            let (status_code, response) = match response_mode {
                ResponseMode::Synchronous => {
                    // Drive the saga inline within the response budget; the
                    // background runner picks it up if the budget runs out
                    let budget = snapshot
                        .config
                        .payment_type(payment.payment_type.as_str())
                        .map(|pt| pt.timeouts.sync_response_budget_ms)
                        .unwrap_or(5_000);
                    state
                        .engine
                        .run_to_completion(saga_id, Duration::from_millis(budget))
                        .await?;

                    let current = state
                        .engine
                        .deps()
                        .payments
                        .get(&tenant, payment.payment_id)
                        .await?
                        .unwrap_or(payment);

                    let pain002 = match state.dispatcher.dispatch(&current, &snapshot).await {
                        Ok(DispatchResult::Synchronous(doc)) => {
                            Some(iso20022::pain002::to_xml(&doc)?)
                        }
                        _ => None,
                    };

                    (
                        StatusCode::CREATED,
                        AcceptResponse {
                            payment_id: current.payment_id.to_string(),
                            uetr: current.uetr.as_str().to_string(),
                            status: format!("{}", current.status),
                            pain002,
                            kafka_topic_name: None,
                        },
                    )
                }
                ResponseMode::Asynchronous => (
                    StatusCode::ACCEPTED,
                    AcceptResponse {
                        payment_id: payment.payment_id.to_string(),
                        uetr: payment.uetr.as_str().to_string(),
                        status: "ACCEPTED_FOR_PROCESSING".to_string(),
                        pain002: None,
                        kafka_topic_name: None,
                    },
                ),
                ResponseMode::KafkaTopic => {
                    let kafka_topic = snapshot
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
                        });
                    (
                        StatusCode::ACCEPTED,
                        AcceptResponse {
                            payment_id: payment.payment_id.to_string(),
                            uetr: payment.uetr.as_str().to_string(),
                            status: "ACCEPTED_FOR_PROCESSING".to_string(),
                            pain002: None,
                            kafka_topic_name: Some(kafka_topic),
                        },
                    )
                }
            };

            let mode_label = match response_mode {
                ResponseMode::Synchronous => "synchronous",
                ResponseMode::Asynchronous => "asynchronous",
                ResponseMode::KafkaTopic => "kafka_topic",
            };
            ACCEPT_DURATION_SECONDS
                .with_label_values(&[&tenant.tenant_id, mode_label])
                .observe(start.elapsed().as_secs_f64());

            Ok((status_code, Json(response)))
        }
    }
}

/// `GET /payments/{payment_id}` (tenant-scoped; cross-tenant ids are 404)
pub async fn get_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Payment>, ApiError> {
    let tenant = tenant_from_headers(&headers)?;
    let payment = state
        .engine
        .deps()
        .payments
        .get(&tenant, PaymentId(payment_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(payment))
}

/// Cancel response carrying the camt.029 resolution
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// Payment id
    pub payment_id: String,
    /// camt.029 confirmation code (CNCL / RJCR)
    pub confirmation: String,
    /// camt.029 XML
    pub camt029: String,
}

/// `POST /payments/{payment_id}/cancel`
///
/// Issues the camt.055 through the saga (cancel flag honoured at the next
/// step boundary) and answers with a camt.029 resolution.
pub async fn cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let tenant = tenant_from_headers(&headers)?;
    let deps = state.engine.deps();

    let payment = deps
        .payments
        .get(&tenant, PaymentId(payment_id))
        .await?
        .ok_or(ApiError::NotFound)?;

    let accepted = deps.sagas.request_cancel(&tenant, payment.payment_id).await?;

    if accepted {
        // The camt.055 goes out on the bus for audit; the saga honours the
        // cancel flag at its next step boundary
        let camt055 = camt::build_camt055(
            &payment,
            &format!("ASGN-{}", payment.payment_id),
            &Utc::now().to_rfc3339(),
        );
        let xml = iso20022::to_xml("Document", &camt055)?;
        let signal = serde_json::json!({
            "paymentId": payment.payment_id.to_string(),
            "uetr": payment.uetr.as_str(),
            "tenantId": tenant.tenant_id,
            "camt055": xml,
        });
        if let Err(e) = state
            .bus
            .publish(
                topics::PAYMENT_CANCEL_REQUESTED,
                bytes::Bytes::from(signal.to_string()),
            )
            .await
        {
            tracing::warn!("Cancel-request audit publish failed: {}", e);
        }
    }
    let outcome = if accepted {
        CancelOutcome::Cancelled
    } else {
        CancelOutcome::Rejected
    };

    let camt029 = camt::build_camt029(
        outcome,
        &format!("ASGN-{}", payment.payment_id),
        &Utc::now().to_rfc3339(),
    );
    let xml = iso20022::to_xml("Document", &camt029)?;

    let status = if accepted {
        StatusCode::ACCEPTED
    } else {
        StatusCode::CONFLICT
    };
    Ok((
        status,
        Json(CancelResponse {
            payment_id: payment.payment_id.to_string(),
            confirmation: outcome.confirmation_code().to_string(),
            camt029: xml,
        }),
    ))
}
