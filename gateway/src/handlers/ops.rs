//! Health, metrics and operator endpoints

use crate::error::ApiError;
use crate::handlers::tenant_from_headers;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use payment_core::Saga;
use prometheus::{Encoder, TextEncoder};
use response_dispatcher::DeadLetter;
use serde::Serialize;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Version
    pub version: &'static str,
    /// Store reachable
    pub store_ok: bool,
    /// Broker reachable
    pub bus_ok: bool,
}

/// `GET /health`: liveness plus readiness probes of the store and broker
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ok = state
        .engine
        .deps()
        .sagas
        .due(chrono::Utc::now(), 1)
        .await
        .is_ok();
    let bus_ok = state
        .bus
        .publish("payrail.health.probe", bytes::Bytes::from_static(b"{}"))
        .await
        .is_ok();

    Json(HealthResponse {
        status: if store_ok && bus_ok { "healthy" } else { "degraded" },
        service: "payrail-gateway",
        version: env!("CARGO_PKG_VERSION"),
        store_ok,
        bus_ok,
    })
}

/// `GET /metrics`: Prometheus text exposition of every registered metric
pub async fn metrics() -> Result<String, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Dead-letter listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterResponse {
    /// Sagas whose compensation exhausted retries
    pub dead_lettered_sagas: Vec<Saga>,
    /// Undeliverable callback responses
    pub undelivered_responses: Vec<DeadLetter>,
}

/// `GET /ops/dead-letters`: tenant-scoped operator listing; dead-lettered
/// sagas never auto-retry
pub async fn dead_letters(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DeadLetterResponse>, ApiError> {
    let tenant = tenant_from_headers(&headers)?;
    let sagas = state.engine.deps().sagas.dead_lettered(&tenant).await?;
    let responses = state.response_dlq.for_tenant(&tenant.tenant_id).await;

    Ok(Json(DeadLetterResponse {
        dead_lettered_sagas: sagas,
        undelivered_responses: responses,
    }))
}
