//! camt messages: settlement notifications and cancellation flow
//!
//! - camt.054 BankToCustomerDebitCreditNotification: inbound settlement
//!   confirmations from a rail
//! - camt.055 CustomerPaymentCancellationRequest: outbound cancel
//! - camt.056 FIToFIPaymentCancellationRequest: rail-level cancel wire
//! - camt.029 ResolutionOfInvestigation: cancel outcome

use crate::common::{ActiveAmount, Reason};
use crate::{Error, Result};
use payment_core::{Payment, Uetr};
use serde::{Deserialize, Serialize};

/// camt.054 document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camt054Document {
    /// Bank-to-customer debit/credit notification (BkToCstmrDbtCdtNtfctn)
    #[serde(rename = "BkToCstmrDbtCdtNtfctn")]
    pub notification: DebitCreditNotification,
}

/// BkToCstmrDbtCdtNtfctn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebitCreditNotification {
    /// Notifications (Ntfctn)
    #[serde(rename = "Ntfctn", default)]
    pub notifications: Vec<Notification>,
}

/// Ntfctn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID (Id)
    #[serde(rename = "Id")]
    pub id: String,
    /// Entries (Ntry)
    #[serde(rename = "Ntry", default)]
    pub entries: Vec<Entry>,
}

/// Ntry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Amount (Amt)
    #[serde(rename = "Amt")]
    pub amount: ActiveAmount,
    /// Credit/debit indicator (CdtDbtInd): CRDT or DBIT
    #[serde(rename = "CdtDbtInd")]
    pub credit_debit: String,
    /// Entry status (Sts): BOOK or PDNG
    #[serde(rename = "Sts")]
    pub status: String,
    /// Entry details (NtryDtls)
    #[serde(rename = "NtryDtls", skip_serializing_if = "Option::is_none")]
    pub details: Option<EntryDetails>,
}

/// NtryDtls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDetails {
    /// Transaction details (TxDtls)
    #[serde(rename = "TxDtls", skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionDetails>,
}

/// TxDtls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetails {
    /// References (Refs)
    #[serde(rename = "Refs", skip_serializing_if = "Option::is_none")]
    pub references: Option<References>,
}

/// Refs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct References {
    /// End-to-end ID (EndToEndId)
    #[serde(rename = "EndToEndId", skip_serializing_if = "Option::is_none")]
    pub end_to_end_id: Option<String>,
    /// UETR
    #[serde(rename = "UETR", skip_serializing_if = "Option::is_none")]
    pub uetr: Option<String>,
}

/// One booked movement extracted from a camt.054
#[derive(Debug, Clone)]
pub struct SettlementEvent {
    /// UETR, when the rail echoed it
    pub uetr: Option<Uetr>,
    /// End-to-end id, when echoed
    pub end_to_end_id: Option<String>,
    /// Amount text as carried on the wire
    pub amount: String,
    /// Currency
    pub currency: String,
    /// True for CRDT entries
    pub credit: bool,
    /// True when the entry status is BOOK
    pub booked: bool,
}

/// Parse camt.054 from XML
pub fn parse_camt054(xml: &str) -> Result<Camt054Document> {
    crate::from_xml(xml)
}

/// Extract settlement events from every entry
pub fn settlement_events(doc: &Camt054Document) -> Result<Vec<SettlementEvent>> {
    let mut out = Vec::new();
    for ntfctn in &doc.notification.notifications {
        for entry in &ntfctn.entries {
            let refs = entry
                .details
                .as_ref()
                .and_then(|d| d.transaction.as_ref())
                .and_then(|t| t.references.as_ref());

            let uetr = match refs.and_then(|r| r.uetr.as_deref()) {
                Some(raw) => Some(Uetr::parse(raw).map_err(Error::Domain)?),
                None => None,
            };

            out.push(SettlementEvent {
                uetr,
                end_to_end_id: refs.and_then(|r| r.end_to_end_id.clone()),
                amount: entry.amount.value.clone(),
                currency: entry.amount.currency.clone(),
                credit: entry.credit_debit == "CRDT",
                booked: entry.status == "BOOK",
            });
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Cancellation flow
// ---------------------------------------------------------------------------

/// camt.055 document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camt055Document {
    /// Customer payment cancellation request (CstmrPmtCxlReq)
    #[serde(rename = "CstmrPmtCxlReq")]
    pub request: CancellationRequest,
}

/// CstmrPmtCxlReq / FIToFIPmtCxlReq body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationRequest {
    /// Assignment (Assgnmt)
    #[serde(rename = "Assgnmt")]
    pub assignment: Assignment,
    /// Underlying transactions (Undrlyg)
    #[serde(rename = "Undrlyg")]
    pub underlying: Underlying,
}

/// Assgnmt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Assignment ID (Id)
    #[serde(rename = "Id")]
    pub id: String,
    /// Creation date/time (CreDtTm)
    #[serde(rename = "CreDtTm")]
    pub creation_date_time: String,
}

/// Undrlyg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Underlying {
    /// Transaction information (TxInf)
    #[serde(rename = "TxInf")]
    pub transactions: Vec<CancellationTransaction>,
}

/// TxInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationTransaction {
    /// Cancellation ID (CxlId)
    #[serde(rename = "CxlId")]
    pub cancellation_id: String,
    /// Original end-to-end ID (OrgnlEndToEndId)
    #[serde(rename = "OrgnlEndToEndId")]
    pub original_end_to_end_id: String,
    /// Original UETR (OrgnlUETR)
    #[serde(rename = "OrgnlUETR")]
    pub original_uetr: String,
    /// Original instructed amount (OrgnlInstdAmt)
    #[serde(rename = "OrgnlInstdAmt")]
    pub original_amount: ActiveAmount,
    /// Cancellation reason (CxlRsnInf)
    #[serde(rename = "CxlRsnInf")]
    pub reason: CancellationReasonInfo,
}

/// CxlRsnInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationReasonInfo {
    /// Reason (Rsn)
    #[serde(rename = "Rsn")]
    pub reason: Reason,
}

/// Build a camt.055 for an operator-initiated cancel. `CUST` is the
/// requested-by-customer reason code.
pub fn build_camt055(payment: &Payment, assignment_id: &str, created_at: &str) -> Camt055Document {
    Camt055Document {
        request: CancellationRequest {
            assignment: Assignment {
                id: assignment_id.to_string(),
                creation_date_time: created_at.to_string(),
            },
            underlying: Underlying {
                transactions: vec![CancellationTransaction {
                    cancellation_id: format!("CXL-{}", payment.payment_id),
                    original_end_to_end_id: payment.end_to_end_id.clone(),
                    original_uetr: payment.uetr.as_str().to_string(),
                    original_amount: ActiveAmount::new(
                        payment.amount.currency.as_str(),
                        payment.amount.amount.to_string(),
                    ),
                    reason: CancellationReasonInfo {
                        reason: Reason {
                            code: Some("CUST".to_string()),
                        },
                    },
                }],
            },
        },
    }
}

/// camt.056 document root (rail-level cancellation wire)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camt056Document {
    /// FI-to-FI payment cancellation request (FIToFIPmtCxlReq)
    #[serde(rename = "FIToFIPmtCxlReq")]
    pub request: CancellationRequest,
}

/// Build the camt.056 a rail adapter sends for a cancel
pub fn build_camt056(payment: &Payment, assignment_id: &str, created_at: &str) -> Camt056Document {
    let camt055 = build_camt055(payment, assignment_id, created_at);
    Camt056Document {
        request: camt055.request,
    }
}

/// camt.029 document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camt029Document {
    /// Resolution of investigation (RsltnOfInvstgtn)
    #[serde(rename = "RsltnOfInvstgtn")]
    pub resolution: Resolution,
}

/// RsltnOfInvstgtn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// Assignment (Assgnmt)
    #[serde(rename = "Assgnmt")]
    pub assignment: Assignment,
    /// Status (Sts)
    #[serde(rename = "Sts")]
    pub status: ResolutionStatus,
}

/// Sts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionStatus {
    /// Confirmation code (Conf): CNCL cancelled, RJCR rejected
    #[serde(rename = "Conf")]
    pub confirmation: String,
}

/// Cancel outcomes carried in camt.029
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Cancellation executed
    Cancelled,
    /// Cancellation rejected (e.g. already settled)
    Rejected,
}

impl CancelOutcome {
    /// camt.029 confirmation code
    pub fn confirmation_code(&self) -> &'static str {
        match self {
            CancelOutcome::Cancelled => "CNCL",
            CancelOutcome::Rejected => "RJCR",
        }
    }
}

/// Build a camt.029 resolution
pub fn build_camt029(
    outcome: CancelOutcome,
    assignment_id: &str,
    created_at: &str,
) -> Camt029Document {
    Camt029Document {
        resolution: Resolution {
            assignment: Assignment {
                id: assignment_id.to_string(),
                creation_date_time: created_at.to_string(),
            },
            status: ResolutionStatus {
                confirmation: outcome.confirmation_code().to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::{
        Currency, IdempotencyKey, Money, Party, PaymentId, PaymentStatus, PaymentTypeCode,
        TenantContext,
    };
    use rust_decimal_macros::dec;

    fn sample_payment() -> Payment {
        Payment {
            payment_id: PaymentId::generate(),
            uetr: Uetr::generate(),
            tenant: TenantContext::new("T1"),
            amount: Money::new(dec!(99.50), Currency::ZAR).unwrap(),
            debtor: Party::new("ACC-A"),
            creditor: Party::new("ACC-B"),
            payment_type: PaymentTypeCode::new("RTP"),
            local_instrument: None,
            idempotency_key: IdempotencyKey::new("K9"),
            original_message_id: "MSG-9".to_string(),
            end_to_end_id: "E2E-9".to_string(),
            status: PaymentStatus::ClearingSubmitted,
            failure_reason: None,
            config_version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_camt054_settlement_events() {
        let uetr = Uetr::generate();
        let xml = format!(
            r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.054.001.08">
  <BkToCstmrDbtCdtNtfctn>
    <Ntfctn>
      <Id>NTF-1</Id>
      <Ntry>
        <Amt Ccy="ZAR">250.0000</Amt>
        <CdtDbtInd>CRDT</CdtDbtInd>
        <Sts>BOOK</Sts>
        <NtryDtls><TxDtls><Refs><EndToEndId>E2E-3</EndToEndId><UETR>{uetr}</UETR></Refs></TxDtls></NtryDtls>
      </Ntry>
      <Ntry>
        <Amt Ccy="ZAR">10.0000</Amt>
        <CdtDbtInd>DBIT</CdtDbtInd>
        <Sts>PDNG</Sts>
      </Ntry>
    </Ntfctn>
  </BkToCstmrDbtCdtNtfctn>
</Document>"#
        );

        let doc = parse_camt054(&xml).unwrap();
        let events = settlement_events(&doc).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].credit && events[0].booked);
        assert_eq!(events[0].uetr.as_ref().unwrap(), &uetr);
        assert!(!events[1].credit && !events[1].booked);
        assert!(events[1].uetr.is_none());
    }

    #[test]
    fn test_camt055_carries_uetr_and_reason() {
        let payment = sample_payment();
        let doc = build_camt055(&payment, "ASGN-1", "2025-01-01T11:00:00Z");
        let xml = crate::to_xml("Document", &doc).unwrap();
        assert!(xml.contains(&format!("<OrgnlUETR>{}</OrgnlUETR>", payment.uetr)));
        assert!(xml.contains("<Cd>CUST</Cd>"));
    }

    #[test]
    fn test_camt029_confirmation_codes() {
        let doc = build_camt029(CancelOutcome::Cancelled, "ASGN-1", "2025-01-01T11:00:00Z");
        assert_eq!(doc.resolution.status.confirmation, "CNCL");
        let doc = build_camt029(CancelOutcome::Rejected, "ASGN-1", "2025-01-01T11:00:00Z");
        assert_eq!(doc.resolution.status.confirmation, "RJCR");
    }
}
