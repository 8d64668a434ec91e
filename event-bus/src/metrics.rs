//! Prometheus metrics for the event bus

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, HistogramVec,
    IntGauge,
};

lazy_static! {
    /// Total events published
    pub static ref EVENT_PUBLISH_TOTAL: CounterVec = register_counter_vec!(
        "event_bus_publish_total",
        "Total events published",
        &["topic", "status"]
    )
    .unwrap();

    /// Event publish duration
    pub static ref EVENT_PUBLISH_DURATION: HistogramVec = register_histogram_vec!(
        "event_bus_publish_duration_seconds",
        "Event publish duration in seconds",
        &["topic"]
    )
    .unwrap();

    /// Unpublished outbox rows
    pub static ref OUTBOX_BACKLOG: IntGauge = register_int_gauge!(
        "event_bus_outbox_backlog",
        "Unpublished outbox rows"
    )
    .unwrap();
}
