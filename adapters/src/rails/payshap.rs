//! PayShap adapter (instant retail, proxy-addressed)
//!
//! JSON wire carrying the proxy identifier when the local instrument is a
//! proxy payment. Submission is acknowledged immediately; the settlement
//! confirmation arrives asynchronously keyed by UETR. Recall is supported.

use crate::{
    clearing::{Capabilities, ClearingAdapter, ClearingOutcome},
    framework::{RailClient, WireBody},
    Error, Result,
};
use async_trait::async_trait;
use iso20022::camt::CancelOutcome;
use payment_core::Payment;
use serde::Deserialize;
use serde_json::json;
use tenant_config::Rail;

/// Local instrument code for proxy-addressed payments
pub const PROXY_INSTRUMENT: &str = "PBPX";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayShapAck {
    status: String,
    #[serde(default)]
    shap_ref: Option<String>,
    #[serde(default)]
    reason_code: Option<String>,
}

/// PayShap adapter
pub struct PayShapAdapter {
    client: RailClient,
}

impl PayShapAdapter {
    /// Wrap a rail client
    pub fn new(client: RailClient) -> Self {
        Self { client }
    }

    fn build_wire(payment: &Payment) -> serde_json::Value {
        let proxy = payment
            .local_instrument
            .as_deref()
            .filter(|i| *i == PROXY_INSTRUMENT)
            .map(|_| payment.creditor.account.clone());
        json!({
            "uetr": payment.uetr.as_str(),
            "endToEndId": payment.end_to_end_id,
            "amount": payment.amount.amount.to_string(),
            "currency": payment.amount.currency.as_str(),
            "payerAccount": payment.debtor.account,
            "payeeAccount": payment.creditor.account,
            "payeeProxy": proxy,
        })
    }

    fn interpret(uetr: &str, body: &str) -> Result<ClearingOutcome> {
        let ack: PayShapAck = serde_json::from_str(body)
            .map_err(|e| Error::Mapping(format!("payshap ack: {}", e)))?;
        Ok(match ack.status.as_str() {
            "ACCEPTED" | "PENDING" => ClearingOutcome::Accepted {
                tracking_ref: ack.shap_ref.unwrap_or_else(|| uetr.to_string()),
            },
            "SETTLED" => ClearingOutcome::Settled,
            "REJECTED" => ClearingOutcome::Rejected {
                reason_code: ack.reason_code.unwrap_or_else(|| "NARR".to_string()),
            },
            other => ClearingOutcome::Rejected {
                reason_code: format!("UNKNOWN_{}", other),
            },
        })
    }
}

#[async_trait]
impl ClearingAdapter for PayShapAdapter {
    fn adapter_id(&self) -> &str {
        &self.client.config().adapter_id
    }

    fn rail(&self) -> Rail {
        Rail::PayShap
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_cancel: true,
            synchronous: false,
        }
    }

    async fn submit(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let wire = Self::build_wire(payment);
        let response = self.client.call("submit", None, WireBody::Json(wire)).await?;
        Self::interpret(payment.uetr.as_str(), &response.body)
    }

    async fn cancel(&self, payment: &Payment) -> Result<CancelOutcome> {
        let response = self
            .client
            .call(
                "cancel",
                Some("/recall"),
                WireBody::Json(json!({
                    "uetr": payment.uetr.as_str(),
                    "reason": "CUST",
                })),
            )
            .await?;
        let ack: PayShapAck = serde_json::from_str(&response.body)
            .map_err(|e| Error::Mapping(format!("payshap recall: {}", e)))?;
        Ok(match ack.status.as_str() {
            "CANCELLED" => CancelOutcome::Cancelled,
            _ => CancelOutcome::Rejected,
        })
    }

    async fn poll(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let response = self
            .client
            .call(
                "poll",
                Some(&format!("/status/{}", payment.uetr)),
                WireBody::Json(json!({})),
            )
            .await?;
        Self::interpret(payment.uetr.as_str(), &response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::{
        Currency, IdempotencyKey, Money, Party, PaymentId, PaymentStatus, PaymentTypeCode,
        TenantContext, Uetr,
    };
    use rust_decimal_macros::dec;

    fn payment(instrument: Option<&str>) -> Payment {
        Payment {
            payment_id: PaymentId::generate(),
            uetr: Uetr::generate(),
            tenant: TenantContext::new("T1"),
            amount: Money::new(dec!(50), Currency::ZAR).unwrap(),
            debtor: Party::new("ACC-A"),
            creditor: Party::new("+27821234567"),
            payment_type: PaymentTypeCode::new("RTP"),
            local_instrument: instrument.map(str::to_string),
            idempotency_key: IdempotencyKey::new("K1"),
            original_message_id: "MSG".to_string(),
            end_to_end_id: "E2E".to_string(),
            status: PaymentStatus::Routed,
            failure_reason: None,
            config_version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_proxy_instrument_sets_payee_proxy() {
        let wire = PayShapAdapter::build_wire(&payment(Some(PROXY_INSTRUMENT)));
        assert_eq!(wire["payeeProxy"], "+27821234567");

        let wire = PayShapAdapter::build_wire(&payment(None));
        assert!(wire["payeeProxy"].is_null());
    }

    #[test]
    fn test_accepted_ack() {
        let outcome = PayShapAdapter::interpret(
            "deadbeef",
            r#"{"status":"ACCEPTED","shapRef":"SHAP-7"}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            ClearingOutcome::Accepted {
                tracking_ref: "SHAP-7".to_string()
            }
        );
    }
}
