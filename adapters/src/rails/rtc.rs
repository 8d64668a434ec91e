//! RTC adapter (real-time clearing)
//!
//! Instant credit transfer: `submit` posts a pacs.008 and the rail answers
//! with a pacs.002 in the same exchange. Settlement is irrevocable, so
//! there is no cancel.

use crate::{
    clearing::{Capabilities, ClearingAdapter, ClearingOutcome},
    framework::{RailClient, WireBody},
    Error, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use iso20022::camt::CancelOutcome;
use iso20022::{pacs002, pacs008};
use payment_core::Payment;
use tenant_config::Rail;

/// RTC adapter
pub struct RtcAdapter {
    client: RailClient,
}

impl RtcAdapter {
    /// Wrap a rail client
    pub fn new(client: RailClient) -> Self {
        Self { client }
    }

    fn interpret(body: &str) -> Result<ClearingOutcome> {
        let doc = pacs002::parse(body)?;
        let reports = pacs002::to_status_reports(&doc)?;
        let report = reports
            .first()
            .ok_or_else(|| Error::Mapping("empty pacs.002 from RTC".to_string()))?;
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
impl ClearingAdapter for RtcAdapter {
    fn adapter_id(&self) -> &str {
        &self.client.config().adapter_id
    }

    fn rail(&self) -> Rail {
        Rail::Rtc
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_cancel: false,
            synchronous: true,
        }
    }

    async fn submit(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let message_id = format!("RTC-{}", payment.payment_id);
        let doc = pacs008::from_payment(payment, &message_id, &Utc::now().to_rfc3339());
        let xml = pacs008::to_xml(&doc)?;

        let response = self.client.call("submit", None, WireBody::Xml(xml)).await?;
        Self::interpret(&response.body)
    }

    async fn cancel(&self, _payment: &Payment) -> Result<CancelOutcome> {
        Err(Error::Config("RTC settlement is irrevocable; no recall".to_string()))
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
        Self::interpret(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::Uetr;

    fn pacs002_body(uetr: &Uetr, status: &str, reason: Option<&str>) -> String {
        let reason_block = reason
            .map(|r| format!("<StsRsnInf><Rsn><Cd>{r}</Cd></Rsn></StsRsnInf>"))
            .unwrap_or_default();
        format!(
            r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.002.001.10">
  <FIToFIPmtStsRpt>
    <GrpHdr><MsgId>ACK</MsgId><CreDtTm>2025-01-01T00:00:00Z</CreDtTm></GrpHdr>
    <TxInfAndSts><OrgnlUETR>{uetr}</OrgnlUETR><TxSts>{status}</TxSts>{reason_block}</TxInfAndSts>
  </FIToFIPmtStsRpt>
</Document>"#
        )
    }

    #[test]
    fn test_accp_settles_synchronously() {
        let uetr = Uetr::generate();
        assert_eq!(
            RtcAdapter::interpret(&pacs002_body(&uetr, "ACCP", None)).unwrap(),
            ClearingOutcome::Settled
        );
    }

    #[test]
    fn test_rjct_carries_rail_reason() {
        let uetr = Uetr::generate();
        assert_eq!(
            RtcAdapter::interpret(&pacs002_body(&uetr, "RJCT", Some("AC01"))).unwrap(),
            ClearingOutcome::Rejected {
                reason_code: "AC01".to_string()
            }
        );
    }
}
