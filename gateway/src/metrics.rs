//! Gateway metrics
//!
//! Registered in the default registry alongside the library crates'
//! metrics; `/metrics` exports everything in one gather.

use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static::lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "gateway_http_requests_total",
        "HTTP requests by route and status class",
        &["route", "status"]
    )
    .unwrap();

    pub static ref PAYMENTS_ACCEPTED_TOTAL: CounterVec = register_counter_vec!(
        "gateway_payments_accepted_total",
        "Payments accepted (new vs idempotent replay)",
        &["tenant_id", "kind"]
    )
    .unwrap();

    pub static ref ISO_MESSAGES_TOTAL: CounterVec = register_counter_vec!(
        "gateway_iso_messages_total",
        "Inbound ISO 20022 messages",
        &["message_type"]
    )
    .unwrap();

    pub static ref CLEARING_CALLBACKS_TOTAL: CounterVec = register_counter_vec!(
        "gateway_clearing_callbacks_total",
        "Inbound clearing callbacks",
        &["rail", "result"]
    )
    .unwrap();

    pub static ref ACCEPT_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "gateway_accept_duration_seconds",
        "Acceptance handling duration",
        &["tenant_id", "response_mode"]
    )
    .unwrap();
}
