//! Step outcomes
//!
//! Retryable/Terminal/Succeeded/Skipped are data, not control flow; the
//! engine interprets them and schedules the next advancement.

use payment_core::ReasonCode;

/// Result of a step execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step effects are committed
    Succeeded,
    /// Transient failure; re-execute after backoff
    Retryable(String),
    /// Business or permanent failure; saga enters compensation
    Terminal(ReasonCode, String),
    /// Step does not apply to this payment
    Skipped(String),
}

/// Result of a compensation execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// Undo recorded
    Succeeded,
    /// Transient failure; re-run after backoff
    Retryable(String),
    /// The rail cannot undo this step; recorded and the walk continues
    Uncancellable(String),
}

/// Classify an adapter error into a step outcome
pub fn outcome_from_adapter_error(error: &adapters::Error) -> StepOutcome {
    if error.is_retryable() {
        StepOutcome::Retryable(error.reason().to_string())
    } else {
        let reason_code = match error {
            adapters::Error::InsufficientFunds { .. } => ReasonCode::InsufficientFunds,
            adapters::Error::InvalidAccount(_) => ReasonCode::InvalidAccount,
            adapters::Error::Mapping(_) | adapters::Error::Config(_) => ReasonCode::SystemError,
            _ => ReasonCode::ClearingRejected,
        };
        StepOutcome::Terminal(reason_code, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        let outcome = outcome_from_adapter_error(&adapters::Error::CircuitOpen {
            adapter_id: "samos-primary".to_string(),
        });
        assert_eq!(outcome, StepOutcome::Retryable("circuit_open".to_string()));
    }

    #[test]
    fn test_business_errors_are_terminal() {
        let outcome = outcome_from_adapter_error(&adapters::Error::InsufficientFunds {
            account: "ACC-A".to_string(),
        });
        assert!(matches!(
            outcome,
            StepOutcome::Terminal(ReasonCode::InsufficientFunds, _)
        ));
    }

    #[test]
    fn test_config_errors_dead_letter_as_system() {
        let outcome = outcome_from_adapter_error(&adapters::Error::Mapping("bad path".into()));
        assert!(matches!(
            outcome,
            StepOutcome::Terminal(ReasonCode::SystemError, _)
        ));
    }
}
