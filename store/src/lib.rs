//! # Persistence layer
//!
//! Store traits for the engine's aggregates plus two implementations:
//!
//! - [`memory::MemoryStore`]: single-process, used by tests and dev runs
//! - [`postgres::PgStore`]: sqlx/Postgres, used in deployment
//!
//! Row-level tenant isolation is enforced here: every read of a Payment,
//! Saga or dead-letter list takes a [`TenantContext`] and only rows whose
//! `tenant_id` matches are ever returned. A cross-tenant id simply does not
//! exist from the caller's point of view.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod memory;
pub mod outbox;
pub mod postgres;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use outbox::{OutboxEvent, OutboxRecord};
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use payment_core::{
    IdempotencyKey, Payment, PaymentId, PaymentStatus, ReasonCode, Saga, SagaId, TenantContext,
    Uetr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound clearing result recorded against a UETR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearingResultRecord {
    /// UETR the rail echoed
    pub uetr: Uetr,
    /// Tenant owning the payment (resolved via the UETR index)
    pub tenant_id: String,
    /// True when the rail accepted/settled the payment
    pub accepted: bool,
    /// Raw rail status code
    pub rail_status: String,
    /// Rail reason code on rejection
    pub reason_code: Option<String>,
    /// When the callback arrived
    pub received_at: DateTime<Utc>,
}

/// Payment aggregate persistence
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Create payment, its saga, the UETR index entry and the initial outbox
    /// rows in one transaction. Fails with [`Error::Conflict`] when the
    /// idempotency key or UETR already exists.
    async fn create_payment(
        &self,
        payment: &Payment,
        saga: &Saga,
        events: Vec<OutboxEvent>,
    ) -> Result<()>;

    /// Look up an earlier acceptance for `(tenant, idempotency_key)`
    async fn find_by_idempotency_key(
        &self,
        tenant: &TenantContext,
        key: &IdempotencyKey,
    ) -> Result<Option<Payment>>;

    /// Tenant-scoped read
    async fn get(&self, tenant: &TenantContext, id: PaymentId) -> Result<Option<Payment>>;

    /// Persist a status transition together with its outbox rows
    async fn update_status(
        &self,
        tenant: &TenantContext,
        id: PaymentId,
        status: PaymentStatus,
        reason: Option<ReasonCode>,
        events: Vec<OutboxEvent>,
    ) -> Result<()>;
}

/// Saga aggregate persistence with the advancement lease protocol
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Load by id (engine-internal, id is globally unique)
    async fn load(&self, saga_id: SagaId) -> Result<Option<Saga>>;

    /// Tenant-scoped load by payment
    async fn load_by_payment(
        &self,
        tenant: &TenantContext,
        payment_id: PaymentId,
    ) -> Result<Option<Saga>>;

    /// CAS lease acquisition: succeeds only when no live lease is held.
    /// Returns the freshly leased saga state, or `None` when another worker
    /// holds the lease.
    async fn try_acquire_lease(
        &self,
        saga_id: SagaId,
        token: Uuid,
        lease: Duration,
    ) -> Result<Option<Saga>>;

    /// Extend a held lease; returns false when the token no longer holds it
    async fn heartbeat(&self, saga_id: SagaId, token: Uuid, lease: Duration) -> Result<bool>;

    /// Persist the advanced saga state plus outbox rows in one transaction.
    /// Fails with [`Error::LeaseLost`] when `token` no longer holds the lease.
    async fn persist(&self, saga: &Saga, token: Uuid, events: Vec<OutboxEvent>) -> Result<()>;

    /// Drop the lease without state change
    async fn release_lease(&self, saga_id: SagaId, token: Uuid) -> Result<()>;

    /// Sagas ready for advancement: non-terminal, lease available, and not
    /// waiting on a future retry time
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<SagaId>>;

    /// Set the cancel flag; honoured at the next step boundary
    async fn request_cancel(
        &self,
        tenant: &TenantContext,
        payment_id: PaymentId,
    ) -> Result<bool>;

    /// Dead-lettered sagas for operator attention (tenant-scoped)
    async fn dead_lettered(&self, tenant: &TenantContext) -> Result<Vec<Saga>>;
}

/// Outbox persistence consumed by the publisher worker
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Oldest unpublished records, ordered by per-aggregate sequence
    async fn unpublished(&self, limit: usize) -> Result<Vec<OutboxRecord>>;

    /// Mark one record published
    async fn mark_published(&self, id: Uuid) -> Result<()>;

    /// Unpublished backlog size (exported as a gauge)
    async fn backlog(&self) -> Result<usize>;
}

/// UETR reconciliation index. Resolution is not tenant-scoped because rail
/// callbacks arrive before any tenant context exists; the stored row carries
/// the tenant that scope is re-entered with.
#[async_trait]
pub trait UetrIndex: Send + Sync {
    /// Resolve a UETR to its owning tenant and payment
    async fn resolve(&self, uetr: &Uetr) -> Result<Option<(String, PaymentId)>>;
}

/// Inbound clearing results keyed by UETR, with replay dedupe
#[async_trait]
pub trait ClearingResultStore: Send + Sync {
    /// Record a result; returns false when a result for the UETR already
    /// exists inside the dedupe window (replayed callback)
    async fn put_result(&self, record: ClearingResultRecord) -> Result<bool>;

    /// Tenant-scoped read, consumed by the await-clearing-result step
    async fn get_result(
        &self,
        tenant: &TenantContext,
        uetr: &Uetr,
    ) -> Result<Option<ClearingResultRecord>>;
}

/// Replayed rail callbacks are deduplicated per UETR inside this window
pub const CALLBACK_DEDUPE_WINDOW_HOURS: i64 = 24;
