//! Building blocks shared across message types

use serde::{Deserialize, Serialize};

/// Amount with an embedded currency attribute, e.g.
/// `<InstdAmt Ccy="ZAR">1000.0000</InstdAmt>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAmount {
    /// Currency (Ccy)
    #[serde(rename = "@Ccy")]
    pub currency: String,
    /// Decimal amount text
    #[serde(rename = "$text")]
    pub value: String,
}

impl ActiveAmount {
    /// Build from currency code and amount text
    pub fn new(currency: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            value: value.into(),
        }
    }
}

/// Party identification (Dbtr / Cdtr / InitgPty)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartyIdentification {
    /// Name (Nm)
    #[serde(rename = "Nm", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Account identification choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountId {
    /// IBAN
    #[serde(rename = "IBAN", skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    /// Other identification (Othr)
    #[serde(rename = "Othr", skip_serializing_if = "Option::is_none")]
    pub other: Option<GenericId>,
}

/// Generic identification (Othr/Id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericId {
    /// Identifier (Id)
    #[serde(rename = "Id")]
    pub id: String,
}

/// Cash account (DbtrAcct / CdtrAcct)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashAccount {
    /// Identification (Id)
    #[serde(rename = "Id")]
    pub id: AccountId,
    /// Currency (Ccy)
    #[serde(rename = "Ccy", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl CashAccount {
    /// Account keyed by an opaque identifier
    pub fn other(id: impl Into<String>) -> Self {
        Self {
            id: AccountId {
                iban: None,
                other: Some(GenericId { id: id.into() }),
            },
            currency: None,
        }
    }

    /// The identifier the engine keys ledger calls by (IBAN preferred)
    pub fn reference(&self) -> Option<&str> {
        self.id
            .iban
            .as_deref()
            .or_else(|| self.id.other.as_ref().map(|o| o.id.as_str()))
    }
}

/// Financial institution identification (FinInstnId)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialInstitutionId {
    /// BIC (BICFI in newer variants, BIC in .03)
    #[serde(rename = "BIC", skip_serializing_if = "Option::is_none")]
    pub bic: Option<String>,
}

/// Agent wrapper (DbtrAgt / CdtrAgt)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agent {
    /// Financial institution identification (FinInstnId)
    #[serde(rename = "FinInstnId")]
    pub fin_instn_id: FinancialInstitutionId,
}

impl Agent {
    /// Agent from a BIC
    pub fn bic(bic: impl Into<String>) -> Self {
        Self {
            fin_instn_id: FinancialInstitutionId {
                bic: Some(bic.into()),
            },
        }
    }
}

/// Status reason information (StsRsnInf)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusReasonInfo {
    /// Reason (Rsn)
    #[serde(rename = "Rsn", skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    /// Additional information (AddtlInf)
    #[serde(rename = "AddtlInf", skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Reason choice (Rsn)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reason {
    /// Code (Cd)
    #[serde(rename = "Cd", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_amount_round_trip() {
        let amt = ActiveAmount::new("ZAR", "1000.0000");
        let xml = quick_xml::se::to_string_with_root("InstdAmt", &amt).unwrap();
        assert_eq!(xml, r#"<InstdAmt Ccy="ZAR">1000.0000</InstdAmt>"#);
        let back: ActiveAmount = quick_xml::de::from_str(&xml).unwrap();
        assert_eq!(back, amt);
    }

    #[test]
    fn test_account_reference_prefers_iban() {
        let acct = CashAccount {
            id: AccountId {
                iban: Some("ZA000001".to_string()),
                other: Some(GenericId {
                    id: "ACC-X".to_string(),
                }),
            },
            currency: None,
        };
        assert_eq!(acct.reference(), Some("ZA000001"));
        assert_eq!(CashAccount::other("ACC-X").reference(), Some("ACC-X"));
    }
}
