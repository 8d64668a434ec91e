//! API error mapping
//!
//! Cross-tenant reads return 404, never 403: a 403 would leak that the
//! resource exists under another tenant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

/// Errors surfaced by the HTTP layer
pub enum ApiError {
    /// Malformed input (structural validation)
    Validation(String),
    /// Tenant policy rejection (inactive tenant, over limit)
    TenantPolicy(String),
    /// Resource does not exist in the caller's tenant scope
    NotFound,
    /// Internal failure; details stay in the logs
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::TenantPolicy(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "timestamp": Utc::now(),
            })),
        )
            .into_response()
    }
}

impl From<tenant_config::Error> for ApiError {
    fn from(e: tenant_config::Error) -> Self {
        match e {
            tenant_config::Error::TenantNotFound(_) => ApiError::NotFound,
            tenant_config::Error::TenantInactive(t) => {
                ApiError::TenantPolicy(format!("tenant {} is not active", t))
            }
            tenant_config::Error::PaymentTypeNotFound { code, .. } => {
                ApiError::Validation(format!("payment type {} not configured", code))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<store::Error> for ApiError {
    fn from(e: store::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<payment_core::Error> for ApiError {
    fn from(e: payment_core::Error) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<saga_engine::Error> for ApiError {
    fn from(e: saga_engine::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<iso20022::Error> for ApiError {
    fn from(e: iso20022::Error) -> Self {
        ApiError::Validation(e.to_string())
    }
}
