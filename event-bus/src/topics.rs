//! Topic naming contract
//!
//! Topic names are part of the external interface; changing one is a
//! breaking change for downstream consumers.

use payment_core::PaymentTypeCode;

/// Payment accepted into the engine
pub const PAYMENT_INITIATED: &str = "payment.initiated.v1";
/// Business validation passed
pub const PAYMENT_VALIDATED: &str = "payment.validated.v1";
/// Payment reached a terminal failure
pub const PAYMENT_FAILED: &str = "payment.failed.v1";
/// Payment completed successfully
pub const PAYMENT_COMPLETED: &str = "payment.completed.v1";
/// Clearing transaction created on a rail
pub const TRANSACTION_CREATED: &str = "transaction.created.v1";
/// Clearing transaction reached its final state
pub const TRANSACTION_COMPLETED: &str = "transaction.completed.v1";
/// Saga started advancing
pub const SAGA_STARTED: &str = "saga.started.v1";
/// Saga reached a terminal state
pub const SAGA_COMPLETED: &str = "saga.completed.v1";
/// Inbound clearing result recorded; wakes the awaiting saga
pub const CLEARING_RESULT_RECEIVED: &str = "clearing.result.received.v1";
/// Operator-initiated cancel accepted; carries the camt.055 for audit
pub const PAYMENT_CANCEL_REQUESTED: &str = "payment.cancel.requested.v1";
/// Dead-letter topic for undeliverable callback responses
pub const RESPONSE_DEAD_LETTER: &str = "payment-engine.responses.dead-letter";

/// Per-(tenant, payment type) pain.002 response topic.
/// An explicit tenant-configured override wins over this derived name.
pub fn response_topic(tenant_id: &str, payment_type: &PaymentTypeCode) -> String {
    format!(
        "payment-engine.{}.responses.{}.pain002",
        tenant_id,
        payment_type.topic_segment()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_topic_contract() {
        let topic = response_topic("T1", &PaymentTypeCode::new("ACH_CREDIT"));
        assert_eq!(topic, "payment-engine.T1.responses.ach_credit.pain002");
    }
}
