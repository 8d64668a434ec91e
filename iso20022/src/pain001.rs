//! pain.001: CustomerCreditTransferInitiation

use crate::common::{
    ActiveAmount, Agent, CashAccount, PartyIdentification,
};
use crate::{Error, Result};
use payment_core::{Currency, Money, Uetr};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// pain.001.001.03 namespace
pub const NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pain.001.001.03";

fn default_namespace() -> String {
    NAMESPACE.to_string()
}

/// pain.001 document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pain001Document {
    /// XML namespace
    #[serde(rename = "@xmlns", default = "default_namespace")]
    pub xmlns: String,
    /// Customer credit transfer initiation (CstmrCdtTrfInitn)
    #[serde(rename = "CstmrCdtTrfInitn")]
    pub initiation: CustomerCreditTransferInitiation,
}

/// CstmrCdtTrfInitn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCreditTransferInitiation {
    /// Group header (GrpHdr)
    #[serde(rename = "GrpHdr")]
    pub group_header: GroupHeader,
    /// Payment information blocks (PmtInf)
    #[serde(rename = "PmtInf")]
    pub payment_info: Vec<PaymentInformation>,
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
    /// Initiating party (InitgPty)
    #[serde(rename = "InitgPty", default)]
    pub initiating_party: PartyIdentification,
}

/// PmtInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInformation {
    /// Payment information ID (PmtInfId)
    #[serde(rename = "PmtInfId")]
    pub payment_info_id: String,
    /// Payment method (PmtMtd), `TRF` for credit transfers
    #[serde(rename = "PmtMtd")]
    pub payment_method: String,
    /// Payment type information (PmtTpInf)
    #[serde(rename = "PmtTpInf", skip_serializing_if = "Option::is_none")]
    pub payment_type_info: Option<PaymentTypeInformation>,
    /// Requested execution date (ReqdExctnDt)
    #[serde(rename = "ReqdExctnDt", skip_serializing_if = "Option::is_none")]
    pub requested_execution_date: Option<String>,
    /// Debtor (Dbtr)
    #[serde(rename = "Dbtr", default)]
    pub debtor: PartyIdentification,
    /// Debtor account (DbtrAcct)
    #[serde(rename = "DbtrAcct")]
    pub debtor_account: CashAccount,
    /// Debtor agent (DbtrAgt)
    #[serde(rename = "DbtrAgt", skip_serializing_if = "Option::is_none")]
    pub debtor_agent: Option<Agent>,
    /// Transactions (CdtTrfTxInf)
    #[serde(rename = "CdtTrfTxInf")]
    pub transactions: Vec<CreditTransferTransaction>,
}

/// PmtTpInf
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentTypeInformation {
    /// Local instrument (LclInstrm)
    #[serde(rename = "LclInstrm", skip_serializing_if = "Option::is_none")]
    pub local_instrument: Option<LocalInstrument>,
}

/// LclInstrm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalInstrument {
    /// Code (Cd)
    #[serde(rename = "Cd")]
    pub code: String,
}

/// CdtTrfTxInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransferTransaction {
    /// Payment identification (PmtId)
    #[serde(rename = "PmtId")]
    pub payment_id: PaymentIdentification,
    /// Amount (Amt)
    #[serde(rename = "Amt")]
    pub amount: Amount,
    /// Creditor agent (CdtrAgt)
    #[serde(rename = "CdtrAgt", skip_serializing_if = "Option::is_none")]
    pub creditor_agent: Option<Agent>,
    /// Creditor (Cdtr)
    #[serde(rename = "Cdtr", default)]
    pub creditor: PartyIdentification,
    /// Creditor account (CdtrAcct)
    #[serde(rename = "CdtrAcct")]
    pub creditor_account: CashAccount,
    /// Remittance information (RmtInf)
    #[serde(rename = "RmtInf", skip_serializing_if = "Option::is_none")]
    pub remittance: Option<RemittanceInformation>,
}

/// PmtId
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIdentification {
    /// Instruction ID (InstrId)
    #[serde(rename = "InstrId", skip_serializing_if = "Option::is_none")]
    pub instruction_id: Option<String>,
    /// End-to-end ID (EndToEndId)
    #[serde(rename = "EndToEndId")]
    pub end_to_end_id: String,
    /// UETR, carried when the initiator already assigned one
    #[serde(rename = "UETR", skip_serializing_if = "Option::is_none")]
    pub uetr: Option<String>,
}

/// Amt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amount {
    /// Instructed amount (InstdAmt)
    #[serde(rename = "InstdAmt")]
    pub instructed: ActiveAmount,
}

/// RmtInf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceInformation {
    /// Unstructured (Ustrd)
    #[serde(rename = "Ustrd", skip_serializing_if = "Option::is_none")]
    pub unstructured: Option<String>,
}

/// One canonical instruction extracted from a pain.001, one per CdtTrfTxInf
#[derive(Debug, Clone)]
pub struct CreditTransferInstruction {
    /// Originating MsgId
    pub message_id: String,
    /// EndToEndId of the transaction
    pub end_to_end_id: String,
    /// UETR, when the initiator supplied one
    pub uetr: Option<Uetr>,
    /// Instructed amount
    pub amount: Money,
    /// Debtor account reference
    pub debtor_account: String,
    /// Creditor account reference
    pub creditor_account: String,
    /// Debtor agent BIC
    pub debtor_bic: Option<String>,
    /// Creditor agent BIC
    pub creditor_bic: Option<String>,
    /// Local instrument code
    pub local_instrument: Option<String>,
    /// Remittance text
    pub remittance: Option<String>,
}

/// Parse a pain.001 XML document
pub fn parse(xml: &str) -> Result<Pain001Document> {
    crate::from_xml(xml)
}

/// Extract canonical instructions, one per transaction
pub fn to_instructions(doc: &Pain001Document) -> Result<Vec<CreditTransferInstruction>> {
    let message_id = doc.initiation.group_header.message_id.clone();
    if message_id.is_empty() {
        return Err(Error::MissingField("GrpHdr/MsgId"));
    }

    let mut out = Vec::new();
    for pmt_inf in &doc.initiation.payment_info {
        let debtor_account = pmt_inf
            .debtor_account
            .reference()
            .ok_or(Error::MissingField("DbtrAcct/Id"))?
            .to_string();
        let local_instrument = pmt_inf
            .payment_type_info
            .as_ref()
            .and_then(|t| t.local_instrument.as_ref())
            .map(|l| l.code.clone());

        for tx in &pmt_inf.transactions {
            let currency =
                Currency::parse(&tx.amount.instructed.currency).map_err(Error::Domain)?;
            let value = Decimal::from_str(&tx.amount.instructed.value).map_err(|e| {
                Error::InvalidField {
                    field: "InstdAmt",
                    detail: e.to_string(),
                }
            })?;
            let amount = Money::new(value, currency).map_err(Error::Domain)?;

            let uetr = match &tx.payment_id.uetr {
                Some(raw) => Some(Uetr::parse(raw).map_err(Error::Domain)?),
                None => None,
            };

            out.push(CreditTransferInstruction {
                message_id: message_id.clone(),
                end_to_end_id: tx.payment_id.end_to_end_id.clone(),
                uetr,
                amount,
                debtor_account: debtor_account.clone(),
                creditor_account: tx
                    .creditor_account
                    .reference()
                    .ok_or(Error::MissingField("CdtrAcct/Id"))?
                    .to_string(),
                debtor_bic: pmt_inf
                    .debtor_agent
                    .as_ref()
                    .and_then(|a| a.fin_instn_id.bic.clone()),
                creditor_bic: tx
                    .creditor_agent
                    .as_ref()
                    .and_then(|a| a.fin_instn_id.bic.clone()),
                local_instrument: local_instrument.clone(),
                remittance: tx
                    .remittance
                    .as_ref()
                    .and_then(|r| r.unstructured.clone()),
            });
        }
    }

    if out.is_empty() {
        return Err(Error::MissingField("CdtTrfTxInf"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pain.001.001.03">
  <CstmrCdtTrfInitn>
    <GrpHdr>
      <MsgId>MSG-20250101-001</MsgId>
      <CreDtTm>2025-01-01T10:00:00Z</CreDtTm>
      <NbOfTxs>1</NbOfTxs>
      <InitgPty><Nm>Acme Treasury</Nm></InitgPty>
    </GrpHdr>
    <PmtInf>
      <PmtInfId>PMT-1</PmtInfId>
      <PmtMtd>TRF</PmtMtd>
      <PmtTpInf><LclInstrm><Cd>RTC</Cd></LclInstrm></PmtTpInf>
      <Dbtr><Nm>Acme Ltd</Nm></Dbtr>
      <DbtrAcct><Id><Othr><Id>ACC-A</Id></Othr></Id></DbtrAcct>
      <DbtrAgt><FinInstnId><BIC>BANKZAJJ</BIC></FinInstnId></DbtrAgt>
      <CdtTrfTxInf>
        <PmtId>
          <EndToEndId>E2E-001</EndToEndId>
        </PmtId>
        <Amt><InstdAmt Ccy="ZAR">1000.00</InstdAmt></Amt>
        <Cdtr><Nm>Supplier Pty</Nm></Cdtr>
        <CdtrAcct><Id><Othr><Id>ACC-B</Id></Othr></Id></CdtrAcct>
      </CdtTrfTxInf>
    </PmtInf>
  </CstmrCdtTrfInitn>
</Document>"#;

    #[test]
    fn test_parse_sample() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.initiation.group_header.message_id, "MSG-20250101-001");
        assert_eq!(doc.initiation.payment_info.len(), 1);
    }

    #[test]
    fn test_to_instructions() {
        let doc = parse(SAMPLE).unwrap();
        let instructions = to_instructions(&doc).unwrap();
        assert_eq!(instructions.len(), 1);

        let instr = &instructions[0];
        assert_eq!(instr.message_id, "MSG-20250101-001");
        assert_eq!(instr.end_to_end_id, "E2E-001");
        assert_eq!(instr.debtor_account, "ACC-A");
        assert_eq!(instr.creditor_account, "ACC-B");
        assert_eq!(instr.debtor_bic.as_deref(), Some("BANKZAJJ"));
        assert_eq!(instr.local_instrument.as_deref(), Some("RTC"));
        assert_eq!(instr.amount.currency, Currency::ZAR);
        assert_eq!(instr.amount.amount.to_string(), "1000.0000");
    }

    #[test]
    fn test_missing_creditor_account_rejected() {
        let broken = SAMPLE.replace(
            "<CdtrAcct><Id><Othr><Id>ACC-B</Id></Othr></Id></CdtrAcct>",
            "<CdtrAcct><Id></Id></CdtrAcct>",
        );
        let doc = parse(&broken).unwrap();
        assert!(to_instructions(&doc).is_err());
    }
}
