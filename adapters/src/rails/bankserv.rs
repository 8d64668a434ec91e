//! BankservAfrica adapter (ACH)
//!
//! Batch-oriented rail: `submit` posts a pacs.008 and returns once the rail
//! has accepted the instruction for processing; the final pacs.002 arrives
//! asynchronously keyed by UETR. Recall is supported via camt.056.

use crate::{
    clearing::{Capabilities, ClearingAdapter, ClearingOutcome},
    framework::{RailClient, WireBody},
    Error, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use iso20022::camt::{self, CancelOutcome};
use iso20022::{pacs002, pacs008};
use payment_core::Payment;
use serde::Deserialize;
use tenant_config::Rail;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankservAck {
    status: String,
    #[serde(default)]
    tracking_ref: Option<String>,
    #[serde(default)]
    reason_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankservCancelResult {
    result: String,
}

/// Bankserv adapter
pub struct BankservAdapter {
    client: RailClient,
}

impl BankservAdapter {
    /// Wrap a rail client
    pub fn new(client: RailClient) -> Self {
        Self { client }
    }

    fn interpret_ack(uetr: &str, body: &str) -> Result<ClearingOutcome> {
        let ack: BankservAck = serde_json::from_str(body)
            .map_err(|e| Error::Mapping(format!("bankserv ack: {}", e)))?;
        Ok(match ack.status.as_str() {
            "RECEIVED" | "ACCEPTED" => ClearingOutcome::Accepted {
                tracking_ref: ack.tracking_ref.unwrap_or_else(|| uetr.to_string()),
            },
            "REJECTED" => ClearingOutcome::Rejected {
                reason_code: ack.reason_code.unwrap_or_else(|| "NARR".to_string()),
            },
            other => ClearingOutcome::Rejected {
                reason_code: format!("UNKNOWN_{}", other),
            },
        })
    }

    fn interpret_status(body: &str) -> Result<ClearingOutcome> {
        let doc = pacs002::parse(body)?;
        let reports = pacs002::to_status_reports(&doc)?;
        let report = reports
            .first()
            .ok_or_else(|| Error::Mapping("empty pacs.002 status report".to_string()))?;
        Ok(match report.status {
            pacs002::RailStatus::Accepted => ClearingOutcome::Settled,
            pacs002::RailStatus::Pending => ClearingOutcome::Accepted {
                tracking_ref: report.uetr.as_str().to_string(),
            },
            pacs002::RailStatus::Rejected => ClearingOutcome::Rejected {
                reason_code: report
                    .reason_code
                    .clone()
                    .unwrap_or_else(|| "NARR".to_string()),
            },
        })
    }
}

#[async_trait]
impl ClearingAdapter for BankservAdapter {
    fn adapter_id(&self) -> &str {
        &self.client.config().adapter_id
    }

    fn rail(&self) -> Rail {
        Rail::Bankserv
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_cancel: true,
            synchronous: false,
        }
    }

    async fn submit(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let message_id = format!("BSV-{}", payment.payment_id);
        let doc = pacs008::from_payment(payment, &message_id, &Utc::now().to_rfc3339());
        let xml = pacs008::to_xml(&doc)?;

        let response = self.client.call("submit", None, WireBody::Xml(xml)).await?;
        Self::interpret_ack(payment.uetr.as_str(), &response.body)
    }

    async fn cancel(&self, payment: &Payment) -> Result<CancelOutcome> {
        let assignment_id = format!("CXL-{}", payment.payment_id);
        let doc = camt::build_camt056(payment, &assignment_id, &Utc::now().to_rfc3339());
        let xml = iso20022::to_xml("Document", &doc)?;

        let response = self
            .client
            .call("cancel", Some("/cancel"), WireBody::Xml(xml))
            .await?;
        let result: BankservCancelResult = serde_json::from_str(&response.body)
            .map_err(|e| Error::Mapping(format!("bankserv cancel result: {}", e)))?;
        Ok(match result.result.as_str() {
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
                WireBody::Json(serde_json::json!({})),
            )
            .await?;
        Self::interpret_status(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::Uetr;

    #[test]
    fn test_ack_maps_to_accepted_with_tracking_ref() {
        let outcome = BankservAdapter::interpret_ack(
            "deadbeef",
            r#"{"status":"RECEIVED","trackingRef":"BSV-42"}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            ClearingOutcome::Accepted {
                tracking_ref: "BSV-42".to_string()
            }
        );
    }

    #[test]
    fn test_ack_without_ref_falls_back_to_uetr() {
        let outcome =
            BankservAdapter::interpret_ack("deadbeef", r#"{"status":"ACCEPTED"}"#).unwrap();
        assert_eq!(
            outcome,
            ClearingOutcome::Accepted {
                tracking_ref: "deadbeef".to_string()
            }
        );
    }

    #[test]
    fn test_poll_interprets_pacs002() {
        let uetr = Uetr::generate();
        let xml = format!(
            r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.002.001.10">
  <FIToFIPmtStsRpt>
    <GrpHdr><MsgId>ACK</MsgId><CreDtTm>2025-01-01T00:00:00Z</CreDtTm></GrpHdr>
    <TxInfAndSts><OrgnlUETR>{uetr}</OrgnlUETR><TxSts>ACSC</TxSts></TxInfAndSts>
  </FIToFIPmtStsRpt>
</Document>"#
        );
        assert_eq!(
            BankservAdapter::interpret_status(&xml).unwrap(),
            ClearingOutcome::Settled
        );
    }
}
