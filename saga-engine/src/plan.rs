//! Canonical step plan
//!
//! The step sequence for a credit transfer is fixed; per-payment-type
//! variation (fraud toggles, synchronous vs async rails) is decided inside
//! the steps against the pinned config snapshot.

use crate::steps::{
    AwaitClearingResult, FraudScore, Notify, PostLedger, ReserveFunds, Route, SubmitToClearing,
    Validate,
};
use crate::SagaStep;
use std::sync::Arc;

/// Build the step objects in execution order
pub fn build_plan() -> Vec<Arc<dyn SagaStep>> {
    vec![
        Arc::new(Validate),
        Arc::new(FraudScore),
        Arc::new(ReserveFunds),
        Arc::new(Route),
        Arc::new(SubmitToClearing),
        Arc::new(AwaitClearingResult),
        Arc::new(PostLedger),
        Arc::new(Notify),
    ]
}

/// Step names in execution order; acceptance uses this to seed the saga's
/// step rows
pub fn step_names() -> Vec<&'static str> {
    build_plan().iter().map(|s| s.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_sequence() {
        assert_eq!(
            step_names(),
            vec![
                "validate",
                "fraud_score",
                "reserve_funds",
                "route",
                "submit_clearing",
                "await_clearing_result",
                "post_ledger",
                "notify",
            ]
        );
    }
}
