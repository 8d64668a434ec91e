//! pacs.002: FIToFIPaymentStatusReport (rail callback)

use crate::common::StatusReasonInfo;
use crate::{Error, Result};
use payment_core::Uetr;
use serde::{Deserialize, Serialize};

/// pacs.002.001.10 namespace
pub const NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pacs.002.001.10";

fn default_namespace() -> String {
    NAMESPACE.to_string()
}

/// Transaction status reported by a rail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RailStatus {
    /// ACCP / ACSC - accepted
    Accepted,
    /// ACSP / PDNG - still in flight
    Pending,
    /// RJCT - rejected
    Rejected,
}

impl RailStatus {
    /// Map a TxSts code
    pub fn from_code(code: &str) -> Self {
        match code {
            "ACCP" | "ACSC" | "ACCC" => RailStatus::Accepted,
            "RJCT" => RailStatus::Rejected,
            _ => RailStatus::Pending,
        }
    }
}

/// pacs.002 document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pacs002Document {
    /// XML namespace
    #[serde(rename = "@xmlns", default = "default_namespace")]
    pub xmlns: String,
    /// FI-to-FI payment status report (FIToFIPmtStsRpt)
    #[serde(rename = "FIToFIPmtStsRpt")]
    pub report: FIToFIPaymentStatusReport,
}

/// FIToFIPmtStsRpt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FIToFIPaymentStatusReport {
    /// Group header (GrpHdr)
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,
    /// Transaction status entries (TxInfAndSts)
    #[serde(rename = "TxInfAndSts", default)]
    pub transactions: Vec<TransactionInfoAndStatus>,
}

/// GrpHdr
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupHeader {
    /// Message ID (MsgId)
    #[serde(rename = "MsgId")]
    pub message_id: String,
    /// Creation date/time (CreDtTm)
    #[serde(rename = "CreDtTm")]
    pub creation_date_time: String,
}

/// TxInfAndSts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInfoAndStatus {
    /// Original group information (OrgnlGrpInf)
    #[serde(rename = "OrgnlGrpInf", skip_serializing_if = "Option::is_none")]
    pub original_group: Option<OriginalGroupInfo>,
    /// Original end-to-end ID (OrgnlEndToEndId)
    #[serde(rename = "OrgnlEndToEndId", skip_serializing_if = "Option::is_none")]
    pub original_end_to_end_id: Option<String>,
    /// Original UETR (OrgnlUETR)
    #[serde(rename = "OrgnlUETR", skip_serializing_if = "Option::is_none")]
    pub original_uetr: Option<String>,
    /// Transaction status (TxSts)
    #[serde(rename = "TxSts")]
    pub transaction_status: String,
    /// Status reason (StsRsnInf)
    #[serde(rename = "StsRsnInf", skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<StatusReasonInfo>,
}

/// OrgnlGrpInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalGroupInfo {
    /// Original message ID (OrgnlMsgId)
    #[serde(rename = "OrgnlMsgId")]
    pub original_message_id: String,
    /// Original message name (OrgnlMsgNmId)
    #[serde(rename = "OrgnlMsgNmId")]
    pub original_message_name: String,
}

/// One decoded status report keyed by UETR
#[derive(Debug, Clone)]
pub struct RailStatusReport {
    /// UETR of the original payment
    pub uetr: Uetr,
    /// End-to-end id, when echoed
    pub end_to_end_id: Option<String>,
    /// Mapped status
    pub status: RailStatus,
    /// Rail reason code on rejection
    pub reason_code: Option<String>,
}

/// Parse from XML
pub fn parse(xml: &str) -> Result<Pacs002Document> {
    crate::from_xml(xml)
}

/// Decode status reports; entries without a UETR are rejected because the
/// engine correlates callbacks by UETR only
pub fn to_status_reports(doc: &Pacs002Document) -> Result<Vec<RailStatusReport>> {
    let mut out = Vec::new();
    for tx in &doc.report.transactions {
        let raw_uetr = tx
            .original_uetr
            .as_deref()
            .ok_or(Error::MissingField("TxInfAndSts/OrgnlUETR"))?;
        out.push(RailStatusReport {
            uetr: Uetr::parse(raw_uetr).map_err(Error::Domain)?,
            end_to_end_id: tx.original_end_to_end_id.clone(),
            status: RailStatus::from_code(&tx.transaction_status),
            reason_code: tx
                .status_reason
                .as_ref()
                .and_then(|r| r.reason.as_ref())
                .and_then(|r| r.code.clone()),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(uetr: &str, status: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.002.001.10">
  <FIToFIPmtStsRpt>
    <GrpHdr><MsgId>ACK-1</MsgId><CreDtTm>2025-01-01T10:01:00Z</CreDtTm></GrpHdr>
    <TxInfAndSts>
      <OrgnlEndToEndId>E2E-9</OrgnlEndToEndId>
      <OrgnlUETR>{uetr}</OrgnlUETR>
      <TxSts>{status}</TxSts>
    </TxInfAndSts>
  </FIToFIPmtStsRpt>
</Document>"#
        )
    }

    #[test]
    fn test_accepted_report() {
        let uetr = Uetr::generate();
        let doc = parse(&sample(uetr.as_str(), "ACCP")).unwrap();
        let reports = to_status_reports(&doc).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].uetr, uetr);
        assert_eq!(reports[0].status, RailStatus::Accepted);
    }

    #[test]
    fn test_unknown_status_maps_to_pending() {
        let uetr = Uetr::generate();
        let doc = parse(&sample(uetr.as_str(), "ACSP")).unwrap();
        let reports = to_status_reports(&doc).unwrap();
        assert_eq!(reports[0].status, RailStatus::Pending);
    }

    #[test]
    fn test_missing_uetr_rejected() {
        let xml = sample("x", "ACCP").replace("<OrgnlUETR>x</OrgnlUETR>", "");
        let doc = parse(&xml).unwrap();
        assert!(to_status_reports(&doc).is_err());
    }
}
