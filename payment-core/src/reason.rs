//! Fixed reason-code enumeration surfaced in pain.002
//!
//! Internal diagnostic detail never leaks into a status report: every failure
//! maps onto one of these ISO ExternalStatusReason codes before it reaches a
//! caller.

use serde::{Deserialize, Serialize};

/// Reason code carried in pain.002 `StsRsnInf/Rsn/Cd`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    /// FR01 - fraud check rejected the payment
    FraudRejected,
    /// AM04 - insufficient funds on the debtor account
    InsufficientFunds,
    /// AM02 - amount exceeds the tenant's configured maximum
    OverLimit,
    /// AC01 - account identifier malformed or unknown
    InvalidAccount,
    /// AG01 - counterparty blocked by tenant policy
    BlockedCounterparty,
    /// RR04 - other tenant policy violation
    TenantPolicy,
    /// TM01 - saga or step deadline breached
    Timeout,
    /// Rail returned a business NACK; narrative carries no internal detail
    ClearingRejected,
    /// Operator-initiated cancellation honoured
    Cancelled,
    /// Internal failure; surfaced as NARR with a generic narrative
    SystemError,
}

impl ReasonCode {
    /// ISO ExternalStatusReason code
    pub fn iso_code(&self) -> &'static str {
        match self {
            ReasonCode::FraudRejected => "FR01",
            ReasonCode::InsufficientFunds => "AM04",
            ReasonCode::OverLimit => "AM02",
            ReasonCode::InvalidAccount => "AC01",
            ReasonCode::BlockedCounterparty => "AG01",
            ReasonCode::TenantPolicy => "RR04",
            ReasonCode::Timeout => "TM01",
            ReasonCode::ClearingRejected => "NARR",
            ReasonCode::Cancelled => "DUPL",
            ReasonCode::SystemError => "NARR",
        }
    }

    /// Stable machine-readable name used in events and saga state
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::FraudRejected => "fraud_rejected",
            ReasonCode::InsufficientFunds => "insufficient_funds",
            ReasonCode::OverLimit => "over_limit",
            ReasonCode::InvalidAccount => "invalid_account",
            ReasonCode::BlockedCounterparty => "blocked_counterparty",
            ReasonCode::TenantPolicy => "tenant_policy",
            ReasonCode::Timeout => "saga_timeout",
            ReasonCode::ClearingRejected => "clearing_rejected",
            ReasonCode::Cancelled => "cancelled",
            ReasonCode::SystemError => "system_error",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_maps_to_fr01() {
        assert_eq!(ReasonCode::FraudRejected.iso_code(), "FR01");
    }

    #[test]
    fn test_system_detail_never_leaks() {
        // Internal failures surface as a bare narrative code
        assert_eq!(ReasonCode::SystemError.iso_code(), "NARR");
    }
}
