//! # PayRail gateway
//!
//! HTTP entry point of the payment engine: acceptance API, pain.001
//! ingress, status/cancel, inbound clearing callbacks, health and metrics.
//! Authentication and rate limiting happen at the fronting API gateway;
//! only a validated tenant context enters here.

pub mod acceptance;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod response_worker;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::ops::health))
        .route("/metrics", get(handlers::ops::metrics))
        .route("/ops/dead-letters", get(handlers::ops::dead_letters))
        .route("/payments", post(handlers::payments::accept))
        .route("/payments/:payment_id", get(handlers::payments::get_payment))
        .route(
            "/payments/:payment_id/cancel",
            post(handlers::payments::cancel),
        )
        .route("/iso20022/pain001", post(handlers::iso::pain001))
        .route("/clearing/:rail/callback", post(handlers::callbacks::clearing))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
