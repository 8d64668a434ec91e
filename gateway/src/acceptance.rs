//! Acceptance & idempotency
//!
//! `Accept(payment_request, tenant_ctx, idempotency_key)`: resolves the
//! tenant, enforces `(tenant_id, idempotency_key)` uniqueness, runs
//! structural validation, assigns the UETR, pins the config version and
//! writes the payment, saga and initial outbox rows in one transaction.
//! A replayed key returns the original acceptance verbatim, creating
//! nothing.

use crate::error::ApiError;
use crate::state::AppState;
use chrono::{Duration, Utc};
use event_bus::topics;
use payment_core::{
    Currency, IdempotencyKey, Money, Party, Payment, PaymentId, PaymentStatus, PaymentTypeCode,
    Saga, SagaId, TenantContext, Uetr,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use store::OutboxEvent;
use tenant_config::{ResponseMode, VersionedTenantConfig};
use tracing::info;

/// Canonical payment request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPaymentRequest {
    /// Payment type code
    pub payment_type: String,
    /// Decimal amount
    pub amount: String,
    /// ISO 4217 currency
    pub currency: String,
    /// Debtor account reference
    pub debtor_account: String,
    /// Creditor account reference
    pub creditor_account: String,
    /// Debtor agent BIC
    #[serde(default)]
    pub debtor_bic: Option<String>,
    /// Creditor agent BIC
    #[serde(default)]
    pub creditor_bic: Option<String>,
    /// Local instrument code
    #[serde(default)]
    pub local_instrument: Option<String>,
    /// End-to-end id; defaults to the idempotency key
    #[serde(default)]
    pub end_to_end_id: Option<String>,
    /// Originating message id; defaults to the idempotency key
    #[serde(default)]
    pub message_id: Option<String>,
    /// Pre-assigned UETR (pain.001 pass-through)
    #[serde(default)]
    pub uetr: Option<String>,
}

/// Result of an acceptance call
pub enum AcceptOutcome {
    /// The key was seen before; the original acceptance, verbatim
    Replay(Payment),
    /// A new payment was created
    Accepted {
        /// The new payment
        payment: Payment,
        /// Its saga
        saga_id: SagaId,
        /// Response mode of the payment type
        response_mode: ResponseMode,
        /// Config snapshot pinned at acceptance
        snapshot: Arc<VersionedTenantConfig>,
    },
}

const MAX_ACCOUNT_LEN: usize = 34;

fn validate_structural(request: &CanonicalPaymentRequest) -> Result<(), ApiError> {
    for (field, value) in [
        ("paymentType", &request.payment_type),
        ("debtorAccount", &request.debtor_account),
        ("creditorAccount", &request.creditor_account),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{} is required", field)));
        }
    }
    if request.debtor_account.len() > MAX_ACCOUNT_LEN
        || request.creditor_account.len() > MAX_ACCOUNT_LEN
    {
        return Err(ApiError::Validation(format!(
            "account identifiers are limited to {} characters",
            MAX_ACCOUNT_LEN
        )));
    }
    Ok(())
}

/// Accept a payment
pub async fn accept(
    state: &AppState,
    tenant: &TenantContext,
    idempotency_key: &str,
    request: CanonicalPaymentRequest,
) -> Result<AcceptOutcome, ApiError> {
    let deps = state.engine.deps();

    // Tenant must exist and be ACTIVE
    let snapshot = deps.config.resolve_active(&tenant.tenant_id).await?;

    // Idempotent replay returns the original acceptance with no side effects
    let key = IdempotencyKey::new(idempotency_key);
    if let Some(existing) = deps.payments.find_by_idempotency_key(tenant, &key).await? {
        info!(
            tenant_id = %tenant.tenant_id,
            payment_id = %existing.payment_id,
            "Idempotent replay"
        );
        return Ok(AcceptOutcome::Replay(existing));
    }

    validate_structural(&request)?;

    let currency = Currency::parse(&request.currency)?;
    let value = Decimal::from_str(&request.amount)
        .map_err(|e| ApiError::Validation(format!("amount: {}", e)))?;
    if value <= Decimal::ZERO {
        return Err(ApiError::Validation("amount must be positive".to_string()));
    }
    let amount = Money::new(value, currency)?;

    let payment_type = PaymentTypeCode::new(request.payment_type.clone());
    let type_config = snapshot.config.payment_type(payment_type.as_str())?;
    let response_mode = type_config.response_mode;
    let saga_deadline =
        Utc::now() + Duration::seconds(type_config.timeouts.saga_seconds.max(1) as i64);

    let uetr = match &request.uetr {
        Some(raw) => Uetr::parse(raw)?,
        None => Uetr::generate(),
    };

    let now = Utc::now();
    let payment = Payment {
        payment_id: PaymentId::generate(),
        uetr,
        tenant: tenant.clone(),
        amount,
        debtor: Party {
            account: request.debtor_account,
            agent_bic: request.debtor_bic,
            name: None,
        },
        creditor: Party {
            account: request.creditor_account,
            agent_bic: request.creditor_bic,
            name: None,
        },
        payment_type,
        local_instrument: request.local_instrument,
        idempotency_key: key,
        original_message_id: request
            .message_id
            .unwrap_or_else(|| idempotency_key.to_string()),
        end_to_end_id: request
            .end_to_end_id
            .unwrap_or_else(|| idempotency_key.to_string()),
        status: PaymentStatus::Initiated,
        failure_reason: None,
        config_version: snapshot.version,
        created_at: now,
        updated_at: now,
    };

    let saga = Saga::new(
        SagaId::generate(),
        payment.payment_id,
        tenant.tenant_id.clone(),
        &saga_engine::step_names(),
        saga_deadline,
    );

    let events = vec![
        OutboxEvent::new(
            topics::PAYMENT_INITIATED,
            payment.payment_id.to_string(),
            tenant.tenant_id.clone(),
            serde_json::json!({
                "paymentId": payment.payment_id.to_string(),
                "uetr": payment.uetr.as_str(),
                "paymentType": payment.payment_type.as_str(),
                "amount": payment.amount.amount.to_string(),
                "currency": payment.amount.currency.as_str(),
            }),
        ),
        OutboxEvent::new(
            topics::SAGA_STARTED,
            saga.saga_id.to_string(),
            tenant.tenant_id.clone(),
            serde_json::json!({
                "sagaId": saga.saga_id.to_string(),
                "paymentId": payment.payment_id.to_string(),
            }),
        ),
    ];

    match deps.payments.create_payment(&payment, &saga, events).await {
        Ok(()) => {}
        Err(store::Error::Conflict(_)) => {
            // Raced with a concurrent acceptance of the same key
            if let Some(existing) = deps.payments.find_by_idempotency_key(tenant, &payment.idempotency_key).await? {
                return Ok(AcceptOutcome::Replay(existing));
            }
            return Err(ApiError::Internal("acceptance conflict".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    info!(
        tenant_id = %tenant.tenant_id,
        payment_id = %payment.payment_id,
        uetr = %payment.uetr,
        "Payment accepted"
    );

    Ok(AcceptOutcome::Accepted {
        payment,
        saga_id: saga.saga_id,
        response_mode,
        snapshot,
    })
}
