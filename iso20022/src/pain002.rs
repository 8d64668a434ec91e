//! pain.002: CustomerPaymentStatusReport

use crate::common::{PartyIdentification, Reason, StatusReasonInfo};
use payment_core::{ReasonCode, Uetr};
use serde::{Deserialize, Serialize};

/// pain.002.001.03 namespace
pub const NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pain.002.001.03";

/// Message name identifier carried in event envelopes
pub const MESSAGE_TYPE: &str = "pain.002.001.03";

fn default_namespace() -> String {
    NAMESPACE.to_string()
}

/// Group status (GrpSts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    /// Accepted
    ACCP,
    /// Accepted, settlement in process
    ACSP,
    /// Pending
    PDNG,
    /// Rejected
    RJCT,
}

impl GroupStatus {
    /// Get as wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::ACCP => "ACCP",
            GroupStatus::ACSP => "ACSP",
            GroupStatus::PDNG => "PDNG",
            GroupStatus::RJCT => "RJCT",
        }
    }
}

/// pain.002 document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pain002Document {
    /// XML namespace
    #[serde(rename = "@xmlns", default = "default_namespace")]
    pub xmlns: String,
    /// Customer payment status report (CstmrPmtStsRpt)
    #[serde(rename = "CstmrPmtStsRpt")]
    pub report: CustomerPaymentStatusReport,
}

/// CstmrPmtStsRpt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPaymentStatusReport {
    /// Group header (GrpHdr)
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,
    /// Original group information and status (OrgnlGrpInfAndSts)
    #[serde(rename = "OrgnlGrpInfAndSts")]
    pub original_group: OriginalGroupInfo,
    /// Transaction information and status (OrgnlPmtInfAndSts)
    #[serde(rename = "OrgnlPmtInfAndSts", skip_serializing_if = "Option::is_none")]
    pub original_payment_info: Option<OriginalPaymentInfo>,
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
    /// Initiating party (InitgPty)
    #[serde(rename = "InitgPty", default)]
    pub initiating_party: PartyIdentification,
}

/// OrgnlGrpInfAndSts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalGroupInfo {
    /// Original message ID (OrgnlMsgId)
    #[serde(rename = "OrgnlMsgId")]
    pub original_message_id: String,
    /// Original message name (OrgnlMsgNmId)
    #[serde(rename = "OrgnlMsgNmId")]
    pub original_message_name: String,
    /// Group status (GrpSts)
    #[serde(rename = "GrpSts")]
    pub group_status: String,
    /// Status reason (StsRsnInf)
    #[serde(rename = "StsRsnInf", skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<StatusReasonInfo>,
}

/// OrgnlPmtInfAndSts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalPaymentInfo {
    /// Original payment information ID (OrgnlPmtInfId)
    #[serde(rename = "OrgnlPmtInfId")]
    pub original_payment_info_id: String,
    /// Transaction status entries (TxInfAndSts)
    #[serde(rename = "TxInfAndSts")]
    pub transactions: Vec<TransactionInfoAndStatus>,
}

/// TxInfAndSts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInfoAndStatus {
    /// Status ID (StsId)
    #[serde(rename = "StsId", skip_serializing_if = "Option::is_none")]
    pub status_id: Option<String>,
    /// Original end-to-end ID (OrgnlEndToEndId)
    #[serde(rename = "OrgnlEndToEndId")]
    pub original_end_to_end_id: String,
    /// Transaction status (TxSts)
    #[serde(rename = "TxSts")]
    pub transaction_status: String,
    /// Status reason (StsRsnInf)
    #[serde(rename = "StsRsnInf", skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<StatusReasonInfo>,
    /// Original transaction reference (OrgnlTxRef)
    #[serde(rename = "OrgnlTxRef", skip_serializing_if = "Option::is_none")]
    pub original_tx_ref: Option<OriginalTransactionReference>,
}

/// OrgnlTxRef: carries the UETR back to the initiator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalTransactionReference {
    /// Payment identification (PmtId)
    #[serde(rename = "PmtId", skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<OriginalPaymentId>,
}

/// PmtId inside OrgnlTxRef
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalPaymentId {
    /// UETR
    #[serde(rename = "UETR", skip_serializing_if = "Option::is_none")]
    pub uetr: Option<String>,
}

/// Everything needed to build a pain.002
#[derive(Debug, Clone)]
pub struct StatusReportParams {
    /// Fresh response message id
    pub message_id: String,
    /// MsgId of the originating pain.001
    pub original_message_id: String,
    /// EndToEndId of the reported transaction
    pub end_to_end_id: String,
    /// UETR of the reported payment
    pub uetr: Uetr,
    /// Group status
    pub group_status: GroupStatus,
    /// Transaction status (usually mirrors the group status)
    pub transaction_status: GroupStatus,
    /// Reason on rejection
    pub reason: Option<ReasonCode>,
    /// Creation timestamp, RFC 3339
    pub created_at: String,
}

/// Build a pain.002 document
pub fn build(params: &StatusReportParams) -> Pain002Document {
    let status_reason = params.reason.map(|r| StatusReasonInfo {
        reason: Some(Reason {
            code: Some(r.iso_code().to_string()),
        }),
        additional_info: None,
    });

    Pain002Document {
        xmlns: default_namespace(),
        report: CustomerPaymentStatusReport {
            group_header: GroupHeader {
                message_id: params.message_id.clone(),
                creation_date_time: params.created_at.clone(),
                initiating_party: PartyIdentification::default(),
            },
            original_group: OriginalGroupInfo {
                original_message_id: params.original_message_id.clone(),
                original_message_name: "pain.001.001.03".to_string(),
                group_status: params.group_status.as_str().to_string(),
                status_reason: status_reason.clone(),
            },
            original_payment_info: Some(OriginalPaymentInfo {
                original_payment_info_id: params.original_message_id.clone(),
                transactions: vec![TransactionInfoAndStatus {
                    status_id: None,
                    original_end_to_end_id: params.end_to_end_id.clone(),
                    transaction_status: params.transaction_status.as_str().to_string(),
                    status_reason,
                    original_tx_ref: Some(OriginalTransactionReference {
                        payment_id: Some(OriginalPaymentId {
                            uetr: Some(params.uetr.as_str().to_string()),
                        }),
                    }),
                }],
            }),
        },
    }
}

/// Serialize a pain.002 to XML
pub fn to_xml(doc: &Pain002Document) -> crate::Result<String> {
    crate::to_xml("Document", doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(status: GroupStatus, reason: Option<ReasonCode>) -> StatusReportParams {
        StatusReportParams {
            message_id: "RSP-1".to_string(),
            original_message_id: "MSG-1".to_string(),
            end_to_end_id: "E2E-1".to_string(),
            uetr: Uetr::generate(),
            group_status: status,
            transaction_status: status,
            reason,
            created_at: "2025-01-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_accepted_report_preserves_references() {
        let p = params(GroupStatus::ACCP, None);
        let doc = build(&p);
        let xml = to_xml(&doc).unwrap();

        assert!(xml.contains("<OrgnlMsgId>MSG-1</OrgnlMsgId>"));
        assert!(xml.contains("<OrgnlEndToEndId>E2E-1</OrgnlEndToEndId>"));
        assert!(xml.contains(&format!("<UETR>{}</UETR>", p.uetr)));
        assert!(xml.contains("<GrpSts>ACCP</GrpSts>"));
        assert!(!xml.contains("StsRsnInf"));
    }

    #[test]
    fn test_rejection_carries_reason_code_only() {
        let doc = build(&params(GroupStatus::RJCT, Some(ReasonCode::FraudRejected)));
        let xml = to_xml(&doc).unwrap();

        assert!(xml.contains("<GrpSts>RJCT</GrpSts>"));
        assert!(xml.contains("<Cd>FR01</Cd>"));
        // no internal diagnostic text in the report
        assert!(!xml.contains("fraud_rejected"));
    }

    #[test]
    fn test_round_trip() {
        let doc = build(&params(GroupStatus::ACSP, None));
        let xml = to_xml(&doc).unwrap();
        let back: Pain002Document = crate::from_xml(&xml).unwrap();
        assert_eq!(back.report.original_group.group_status, "ACSP");
    }
}
