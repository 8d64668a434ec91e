//! Inbound clearing callbacks
//!
//! Rails report final status as pacs.002 (or camt.054 booking
//! notifications). The handler decodes, matches on UETR through the
//! reconciliation index, records the result with the 24h dedupe window and
//! signals the parked saga via the bus.

use crate::error::ApiError;
use crate::metrics::CLEARING_CALLBACKS_TOTAL;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use event_bus::topics;
use iso20022::{camt, pacs002};
use payment_core::Uetr;
use serde::Serialize;
use store::ClearingResultRecord;
use tracing::{info, warn};

/// Callback processing summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    /// Results recorded
    pub processed: usize,
    /// Entries dropped (unknown UETR or replay inside the dedupe window)
    pub skipped: usize,
}

struct DecodedResult {
    uetr: Uetr,
    accepted: bool,
    rail_status: String,
    reason_code: Option<String>,
}

fn decode(body: &str) -> Result<Vec<DecodedResult>, ApiError> {
    // pacs.002 first; camt.054 booking notifications as the fallback
    if let Ok(doc) = pacs002::parse(body) {
        if !doc.report.transactions.is_empty() {
            return Ok(pacs002::to_status_reports(&doc)?
                .into_iter()
                .map(|r| DecodedResult {
                    uetr: r.uetr,
                    accepted: r.status != pacs002::RailStatus::Rejected,
                    rail_status: match r.status {
                        pacs002::RailStatus::Accepted => "ACCP".to_string(),
                        pacs002::RailStatus::Pending => "ACSP".to_string(),
                        pacs002::RailStatus::Rejected => "RJCT".to_string(),
                    },
                    reason_code: r.reason_code,
                })
                .collect());
        }
    }

    let doc = camt::parse_camt054(body)?;
    let events = camt::settlement_events(&doc)?;
    Ok(events
        .into_iter()
        .filter(|e| e.booked)
        .filter_map(|e| {
            e.uetr.map(|uetr| DecodedResult {
                uetr,
                accepted: e.credit,
                rail_status: "BOOK".to_string(),
                reason_code: None,
            })
        })
        .collect())
}

/// `POST /clearing/{rail}/callback`
pub async fn clearing(
    State(state): State<AppState>,
    Path(rail): Path<String>,
    body: String,
) -> Result<(StatusCode, Json<CallbackResponse>), ApiError> {
    let results = decode(&body)?;
    let mut processed = 0;
    let mut skipped = 0;

    for result in results {
        // Pending statuses carry no final outcome; the saga keeps waiting
        if result.rail_status == "ACSP" {
            skipped += 1;
            continue;
        }

        let (tenant_id, payment_id) = match state.uetr_index.resolve(&result.uetr).await? {
            Some(found) => found,
            None => {
                warn!(rail, uetr = %result.uetr, "Callback for unknown UETR");
                CLEARING_CALLBACKS_TOTAL
                    .with_label_values(&[&rail, "unknown_uetr"])
                    .inc();
                skipped += 1;
                continue;
            }
        };

        let fresh = state
            .engine
            .deps()
            .clearing_results
            .put_result(ClearingResultRecord {
                uetr: result.uetr.clone(),
                tenant_id: tenant_id.clone(),
                accepted: result.accepted,
                rail_status: result.rail_status.clone(),
                reason_code: result.reason_code.clone(),
                received_at: Utc::now(),
            })
            .await?;

        if !fresh {
            info!(rail, uetr = %result.uetr, "Replayed callback inside dedupe window");
            CLEARING_CALLBACKS_TOTAL
                .with_label_values(&[&rail, "duplicate"])
                .inc();
            skipped += 1;
            continue;
        }

        // Nudge the parked saga; the runner also polls, so a lost signal
        // only costs latency
        let signal = serde_json::json!({
            "uetr": result.uetr.as_str(),
            "tenantId": tenant_id,
            "paymentId": payment_id.to_string(),
            "accepted": result.accepted,
        });
        if let Err(e) = state
            .bus
            .publish(
                topics::CLEARING_RESULT_RECEIVED,
                Bytes::from(signal.to_string()),
            )
            .await
        {
            warn!("Clearing-result signal publish failed: {}", e);
        }

        CLEARING_CALLBACKS_TOTAL
            .with_label_values(&[&rail, "processed"])
            .inc();
        processed += 1;
    }

    Ok((StatusCode::OK, Json(CallbackResponse { processed, skipped })))
}
