//! Payment aggregate

use crate::{
    Error, IdempotencyKey, Money, PaymentId, ReasonCode, Result, TenantContext, Uetr,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant-configurable payment type (e.g. `RTP`, `ACH_CREDIT`, `WIRE_TRANSFER`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentTypeCode(String);

impl PaymentTypeCode {
    /// Wrap a payment type code
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used in topic names
    pub fn topic_segment(&self) -> String {
        self.0.to_lowercase()
    }
}

impl std::fmt::Display for PaymentTypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Debtor or creditor side of a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Account identifier (opaque, keyed into the ledger)
    pub account: String,

    /// Agent BIC, when known
    pub agent_bic: Option<String>,

    /// Party name, when supplied
    pub name: Option<String>,
}

impl Party {
    /// Create a party from an account reference
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            agent_bic: None,
            name: None,
        }
    }
}

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Accepted, saga not yet started
    Initiated,
    /// Business validation passed
    Validated,
    /// Ledger hold placed on the debtor account
    FundsReserved,
    /// Clearing adapter selected
    Routed,
    /// Submitted to a clearing rail
    ClearingSubmitted,
    /// Rail acknowledged acceptance
    ClearingAccepted,
    /// Rail rejected with a business reason
    ClearingRejected,
    /// Funds movement finalized
    Settled,
    /// Terminal failure
    Failed,
    /// Compensated after partial execution
    Reversed,
}

impl PaymentStatus {
    /// Whether the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Settled
                | PaymentStatus::Failed
                | PaymentStatus::Reversed
                | PaymentStatus::ClearingRejected
        )
    }

    /// Permitted next statuses
    fn successors(&self) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match self {
            Initiated => &[Validated, Failed],
            Validated => &[FundsReserved, Failed],
            FundsReserved => &[Routed, Failed, Reversed],
            Routed => &[ClearingSubmitted, Failed, Reversed],
            ClearingSubmitted => &[ClearingAccepted, ClearingRejected, Failed, Reversed],
            ClearingAccepted => &[Settled, Failed, Reversed],
            ClearingRejected => &[Reversed, Failed],
            Settled | Failed | Reversed => &[],
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Payment aggregate root
///
/// Created once at acceptance, mutated only by saga transitions, never
/// deleted. Every read is filtered by `tenant.tenant_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Tenant-scoped identifier, assigned at acceptance
    pub payment_id: PaymentId,

    /// End-to-end reference, unique across the system
    pub uetr: Uetr,

    /// Tenant scope
    pub tenant: TenantContext,

    /// Amount and currency
    pub amount: Money,

    /// Debtor side
    pub debtor: Party,

    /// Creditor side
    pub creditor: Party,

    /// Payment type
    pub payment_type: PaymentTypeCode,

    /// Local instrument code, when supplied
    pub local_instrument: Option<String>,

    /// Client-supplied idempotency key
    pub idempotency_key: IdempotencyKey,

    /// Originating message id (pain.001 MsgId or synthetic)
    pub original_message_id: String,

    /// End-to-end id carried from the instruction
    pub end_to_end_id: String,

    /// Current status
    pub status: PaymentStatus,

    /// Reason recorded on terminal failure
    pub failure_reason: Option<ReasonCode>,

    /// Config version pinned at acceptance
    pub config_version: u64,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Apply a status transition, enforcing the state machine
    pub fn transition(&mut self, to: PaymentStatus) -> Result<()> {
        if self.status == to {
            return Ok(());
        }
        if !self.status.successors().contains(&to) {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a terminal failure with its reason
    pub fn fail(&mut self, reason: ReasonCode) -> Result<()> {
        self.transition(PaymentStatus::Failed)?;
        self.failure_reason = Some(reason);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Currency;
    use rust_decimal_macros::dec;

    fn sample_payment() -> Payment {
        Payment {
            payment_id: PaymentId::generate(),
            uetr: Uetr::generate(),
            tenant: TenantContext::new("T1"),
            amount: Money::new(dec!(1000.00), Currency::ZAR).unwrap(),
            debtor: Party::new("ACC-A"),
            creditor: Party::new("ACC-B"),
            payment_type: PaymentTypeCode::new("RTP"),
            local_instrument: None,
            idempotency_key: IdempotencyKey::new("K1"),
            original_message_id: "MSG-1".to_string(),
            end_to_end_id: "E2E-1".to_string(),
            status: PaymentStatus::Initiated,
            failure_reason: None,
            config_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut p = sample_payment();
        for status in [
            PaymentStatus::Validated,
            PaymentStatus::FundsReserved,
            PaymentStatus::Routed,
            PaymentStatus::ClearingSubmitted,
            PaymentStatus::ClearingAccepted,
            PaymentStatus::Settled,
        ] {
            p.transition(status).unwrap();
        }
        assert!(p.status.is_terminal());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut p = sample_payment();
        assert!(p.transition(PaymentStatus::Settled).is_err());
        assert_eq!(p.status, PaymentStatus::Initiated);
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut p = sample_payment();
        p.fail(ReasonCode::FraudRejected).unwrap();
        assert!(p.transition(PaymentStatus::Validated).is_err());
        assert_eq!(p.failure_reason, Some(ReasonCode::FraudRejected));
    }

    #[test]
    fn test_self_transition_is_noop() {
        let mut p = sample_payment();
        p.transition(PaymentStatus::Initiated).unwrap();
        assert_eq!(p.status, PaymentStatus::Initiated);
    }

    #[test]
    fn test_topic_segment_is_lowercase() {
        assert_eq!(PaymentTypeCode::new("ACH_CREDIT").topic_segment(), "ach_credit");
    }
}
