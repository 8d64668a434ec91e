//! pacs.008: FIToFICustomerCreditTransfer (interbank wire)

use crate::common::{ActiveAmount, Agent, CashAccount, PartyIdentification};
use payment_core::Payment;
use serde::{Deserialize, Serialize};

/// pacs.008.001.08 namespace
pub const NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08";

fn default_namespace() -> String {
    NAMESPACE.to_string()
}

/// pacs.008 document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pacs008Document {
    /// XML namespace
    #[serde(rename = "@xmlns", default = "default_namespace")]
    pub xmlns: String,
    /// FI-to-FI customer credit transfer (FIToFICstmrCdtTrf)
    #[serde(rename = "FIToFICstmrCdtTrf")]
    pub transfer: FIToFICustomerCreditTransfer,
}

/// FIToFICstmrCdtTrf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FIToFICustomerCreditTransfer {
    /// Group header (GrpHdr)
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,
    /// Transactions (CdtTrfTxInf)
    #[serde(rename = "CdtTrfTxInf")]
    pub transactions: Vec<CreditTransferTransaction>,
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
    /// Number of transactions (NbOfTxs)
    #[serde(rename = "NbOfTxs")]
    pub number_of_txs: String,
    /// Settlement information (SttlmInf)
    #[serde(rename = "SttlmInf")]
    pub settlement_info: SettlementInformation,
}

/// SttlmInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementInformation {
    /// Settlement method (SttlmMtd); `CLRG` for clearing systems
    #[serde(rename = "SttlmMtd")]
    pub settlement_method: String,
}

/// CdtTrfTxInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransferTransaction {
    /// Payment identification (PmtId)
    #[serde(rename = "PmtId")]
    pub payment_id: PaymentIdentification,
    /// Interbank settlement amount (IntrBkSttlmAmt)
    #[serde(rename = "IntrBkSttlmAmt")]
    pub settlement_amount: ActiveAmount,
    /// Charge bearer (ChrgBr)
    #[serde(rename = "ChrgBr")]
    pub charge_bearer: String,
    /// Debtor (Dbtr)
    #[serde(rename = "Dbtr", default)]
    pub debtor: PartyIdentification,
    /// Debtor account (DbtrAcct)
    #[serde(rename = "DbtrAcct")]
    pub debtor_account: CashAccount,
    /// Debtor agent (DbtrAgt)
    #[serde(rename = "DbtrAgt", skip_serializing_if = "Option::is_none")]
    pub debtor_agent: Option<Agent>,
    /// Creditor agent (CdtrAgt)
    #[serde(rename = "CdtrAgt", skip_serializing_if = "Option::is_none")]
    pub creditor_agent: Option<Agent>,
    /// Creditor (Cdtr)
    #[serde(rename = "Cdtr", default)]
    pub creditor: PartyIdentification,
    /// Creditor account (CdtrAcct)
    #[serde(rename = "CdtrAcct")]
    pub creditor_account: CashAccount,
}

/// PmtId
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIdentification {
    /// Instruction ID (InstrId)
    #[serde(rename = "InstrId")]
    pub instruction_id: String,
    /// End-to-end ID (EndToEndId)
    #[serde(rename = "EndToEndId")]
    pub end_to_end_id: String,
    /// Transaction ID (TxId)
    #[serde(rename = "TxId")]
    pub transaction_id: String,
    /// UETR
    #[serde(rename = "UETR")]
    pub uetr: String,
}

/// Build a single-transaction pacs.008 from a canonical payment
pub fn from_payment(payment: &Payment, message_id: &str, created_at: &str) -> Pacs008Document {
    Pacs008Document {
        xmlns: default_namespace(),
        transfer: FIToFICustomerCreditTransfer {
            group_header: GroupHeader {
                message_id: message_id.to_string(),
                creation_date_time: created_at.to_string(),
                number_of_txs: "1".to_string(),
                settlement_info: SettlementInformation {
                    settlement_method: "CLRG".to_string(),
                },
            },
            transactions: vec![CreditTransferTransaction {
                payment_id: PaymentIdentification {
                    instruction_id: payment.payment_id.to_string(),
                    end_to_end_id: payment.end_to_end_id.clone(),
                    transaction_id: payment.payment_id.to_string(),
                    uetr: payment.uetr.as_str().to_string(),
                },
                settlement_amount: ActiveAmount::new(
                    payment.amount.currency.as_str(),
                    payment.amount.amount.to_string(),
                ),
                charge_bearer: "SLEV".to_string(),
                debtor: PartyIdentification {
                    name: payment.debtor.name.clone(),
                },
                debtor_account: CashAccount::other(payment.debtor.account.clone()),
                debtor_agent: payment.debtor.agent_bic.clone().map(Agent::bic),
                creditor_agent: payment.creditor.agent_bic.clone().map(Agent::bic),
                creditor: PartyIdentification {
                    name: payment.creditor.name.clone(),
                },
                creditor_account: CashAccount::other(payment.creditor.account.clone()),
            }],
        },
    }
}

/// Serialize to XML
pub fn to_xml(doc: &Pacs008Document) -> crate::Result<String> {
    crate::to_xml("Document", doc)
}

/// Parse from XML
pub fn parse(xml: &str) -> crate::Result<Pacs008Document> {
    crate::from_xml(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::{
        Currency, IdempotencyKey, Money, Party, PaymentId, PaymentStatus, PaymentTypeCode,
        TenantContext, Uetr,
    };
    use rust_decimal_macros::dec;

    fn sample_payment() -> Payment {
        Payment {
            payment_id: PaymentId::generate(),
            uetr: Uetr::generate(),
            tenant: TenantContext::new("T1"),
            amount: Money::new(dec!(250.00), Currency::ZAR).unwrap(),
            debtor: Party {
                account: "ACC-A".to_string(),
                agent_bic: Some("BANKZAJJ".to_string()),
                name: Some("Acme Ltd".to_string()),
            },
            creditor: Party::new("ACC-B"),
            payment_type: PaymentTypeCode::new("ACH_CREDIT"),
            local_instrument: None,
            idempotency_key: IdempotencyKey::new("K2"),
            original_message_id: "MSG-2".to_string(),
            end_to_end_id: "E2E-2".to_string(),
            status: PaymentStatus::Routed,
            failure_reason: None,
            config_version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_wire_round_trip_preserves_uetr() {
        let payment = sample_payment();
        let doc = from_payment(&payment, "PACS-1", "2025-01-01T10:00:00Z");
        let xml = to_xml(&doc).unwrap();
        let back = parse(&xml).unwrap();

        let tx = &back.transfer.transactions[0];
        assert_eq!(tx.payment_id.uetr, payment.uetr.as_str());
        assert_eq!(tx.payment_id.end_to_end_id, "E2E-2");
        assert_eq!(tx.settlement_amount.value, "250.0000");
        assert_eq!(tx.settlement_amount.currency, "ZAR");
    }

    #[test]
    fn test_debtor_agent_bic_carried() {
        let doc = from_payment(&sample_payment(), "PACS-1", "2025-01-01T10:00:00Z");
        let xml = to_xml(&doc).unwrap();
        assert!(xml.contains("<BIC>BANKZAJJ</BIC>"));
    }
}
