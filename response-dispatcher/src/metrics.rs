//! Dispatcher metrics

use prometheus::{register_counter_vec, register_int_gauge, CounterVec, IntGauge};

lazy_static::lazy_static! {
    pub static ref RESPONSES_DISPATCHED_TOTAL: CounterVec = register_counter_vec!(
        "response_dispatch_total",
        "pain.002 responses dispatched",
        &["tenant_id", "mode", "status"]
    )
    .unwrap();

    pub static ref RESPONSE_DLQ_SIZE: IntGauge = register_int_gauge!(
        "response_dlq_size",
        "Undeliverable callback responses held for operators"
    )
    .unwrap();
}
