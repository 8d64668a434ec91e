//! Saga engine metrics

use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec,
};

lazy_static::lazy_static! {
    pub static ref SAGA_STEP_TOTAL: CounterVec = register_counter_vec!(
        "saga_step_total",
        "Step executions by outcome",
        &["step", "outcome"]
    )
    .unwrap();

    pub static ref SAGA_STEP_DURATION: HistogramVec = register_histogram_vec!(
        "saga_step_duration_seconds",
        "Step execution duration",
        &["step"]
    )
    .unwrap();

    pub static ref SAGA_TERMINAL_TOTAL: CounterVec = register_counter_vec!(
        "saga_terminal_total",
        "Sagas reaching a terminal status",
        &["status", "tenant_id"]
    )
    .unwrap();
}
