//! HTTP handlers

pub mod callbacks;
pub mod iso;
pub mod ops;
pub mod payments;

use crate::error::ApiError;
use axum::http::HeaderMap;
use payment_core::TenantContext;

/// Extract the validated tenant context. The fronting gateway authenticated
/// the caller; an absent header is a contract violation, not an auth check.
pub fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantContext, ApiError> {
    let tenant_id = headers
        .get("X-Tenant-ID")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("X-Tenant-ID header is required".to_string()))?;
    Ok(TenantContext::new(tenant_id))
}

/// Extract the client idempotency key
pub fn idempotency_key_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("X-Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Validation("X-Idempotency-Key header is required".to_string()))
}
