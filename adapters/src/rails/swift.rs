//! SWIFT adapter (cross-border)
//!
//! pacs.008 over the SWIFT gateway. Final status arrives via gpi tracker
//! callbacks keyed by UETR. Cancellation uses camt.056.

use crate::{
    clearing::{Capabilities, ClearingAdapter, ClearingOutcome},
    framework::{RailClient, WireBody},
    Error, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use iso20022::camt::{self, CancelOutcome};
use iso20022::pacs008;
use payment_core::Payment;
use serde::Deserialize;
use tenant_config::Rail;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwiftAck {
    status: String,
    #[serde(default)]
    gpi_ref: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// SWIFT adapter
pub struct SwiftAdapter {
    client: RailClient,
}

impl SwiftAdapter {
    /// Wrap a rail client
    pub fn new(client: RailClient) -> Self {
        Self { client }
    }

    fn interpret(uetr: &str, body: &str) -> Result<ClearingOutcome> {
        let ack: SwiftAck = serde_json::from_str(body)
            .map_err(|e| Error::Mapping(format!("swift ack: {}", e)))?;
        Ok(match ack.status.as_str() {
            "ACK" => ClearingOutcome::Accepted {
                tracking_ref: ack.gpi_ref.unwrap_or_else(|| uetr.to_string()),
            },
            "NAK" => ClearingOutcome::Rejected {
                reason_code: ack.reason.unwrap_or_else(|| "NARR".to_string()),
            },
            other => ClearingOutcome::Rejected {
                reason_code: format!("UNKNOWN_{}", other),
            },
        })
    }
}

#[async_trait]
impl ClearingAdapter for SwiftAdapter {
    fn adapter_id(&self) -> &str {
        &self.client.config().adapter_id
    }

    fn rail(&self) -> Rail {
        Rail::Swift
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_cancel: true,
            synchronous: false,
        }
    }

    async fn submit(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let message_id = format!("SWF-{}", payment.payment_id);
        let doc = pacs008::from_payment(payment, &message_id, &Utc::now().to_rfc3339());
        let xml = pacs008::to_xml(&doc)?;

        let response = self.client.call("submit", None, WireBody::Xml(xml)).await?;
        Self::interpret(payment.uetr.as_str(), &response.body)
    }

    async fn cancel(&self, payment: &Payment) -> Result<CancelOutcome> {
        let assignment_id = format!("CXL-{}", payment.payment_id);
        let doc = camt::build_camt056(payment, &assignment_id, &Utc::now().to_rfc3339());
        let xml = iso20022::to_xml("Document", &doc)?;

        let response = self
            .client
            .call("cancel", Some("/cancel"), WireBody::Xml(xml))
            .await?;
        let ack: SwiftAck = serde_json::from_str(&response.body)
            .map_err(|e| Error::Mapping(format!("swift cancel ack: {}", e)))?;
        Ok(match ack.status.as_str() {
            "ACK" | "CANCELLED" => CancelOutcome::Cancelled,
            _ => CancelOutcome::Rejected,
        })
    }

    async fn poll(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let response = self
            .client
            .call(
                "poll",
                Some(&format!("/status/{}", payment.uetr)),
                WireBody::Json(serde_json::json!({})),
            )
            .await?;
        Self::interpret(payment.uetr.as_str(), &response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_and_nak() {
        let accepted =
            SwiftAdapter::interpret("deadbeef", r#"{"status":"ACK","gpiRef":"GPI-1"}"#).unwrap();
        assert_eq!(
            accepted,
            ClearingOutcome::Accepted {
                tracking_ref: "GPI-1".to_string()
            }
        );

        let rejected =
            SwiftAdapter::interpret("deadbeef", r#"{"status":"NAK","reason":"RC01"}"#).unwrap();
        assert_eq!(
            rejected,
            ClearingOutcome::Rejected {
                reason_code: "RC01".to_string()
            }
        );
    }
}
