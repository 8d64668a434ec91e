//! Postgres store
//!
//! Aggregates are persisted as a thin column surface (ids, tenant, status,
//! scheduling columns) plus the full record as JSONB, which keeps the schema
//! stable while the domain model evolves. All multi-row writes run inside
//! one transaction so the outbox rows commit with the state change that
//! produced them.

use crate::{
    ClearingResultRecord, ClearingResultStore, Error, OutboxEvent, OutboxRecord, OutboxStore,
    PaymentStore, Result, SagaStore, UetrIndex, CALLBACK_DEDUPE_WINDOW_HOURS,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use payment_core::{
    IdempotencyKey, Payment, PaymentId, PaymentStatus, ReasonCode, Saga, SagaId, TenantContext,
    Uetr,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        info!("Connected to Postgres and ran migrations");
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, shared pools)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn append_events<'t>(
        tx: &mut sqlx::Transaction<'t, sqlx::Postgres>,
        events: Vec<OutboxEvent>,
    ) -> Result<()> {
        for event in events {
            sqlx::query(
                r#"
                INSERT INTO outbox (id, topic, aggregate_id, tenant_id, sequence, payload, created_at)
                VALUES ($1, $2, $3, $4,
                        (SELECT COALESCE(MAX(sequence), 0) + 1 FROM outbox WHERE aggregate_id = $3),
                        $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&event.topic)
            .bind(&event.aggregate_id)
            .bind(&event.tenant_id)
            .bind(&event.payload)
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    fn payment_from_row(row: &sqlx::postgres::PgRow) -> Result<Payment> {
        let doc: serde_json::Value = row.try_get("doc")?;
        Ok(serde_json::from_value(doc)?)
    }

    fn saga_from_row(row: &sqlx::postgres::PgRow) -> Result<Saga> {
        let doc: serde_json::Value = row.try_get("doc")?;
        let mut saga: Saga = serde_json::from_value(doc)?;
        // lease columns are authoritative; the doc may lag behind a CAS
        saga.lock_token = row.try_get("lock_token")?;
        saga.lease_deadline = row.try_get("lease_deadline")?;
        Ok(saga)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn create_payment(
        &self,
        payment: &Payment,
        saga: &Saga,
        events: Vec<OutboxEvent>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO payments (payment_id, tenant_id, idempotency_key, uetr, status, doc, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (tenant_id, idempotency_key) DO NOTHING
            "#,
        )
        .bind(payment.payment_id.0)
        .bind(&payment.tenant.tenant_id)
        .bind(payment.idempotency_key.as_str())
        .bind(payment.uetr.as_str())
        .bind(format!("{}", payment.status))
        .bind(serde_json::to_value(payment)?)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "idempotency key {} already accepted",
                payment.idempotency_key
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO uetr_index (uetr, tenant_id, payment_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(payment.uetr.as_str())
        .bind(&payment.tenant.tenant_id)
        .bind(payment.payment_id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO sagas (saga_id, payment_id, tenant_id, status, dead_lettered,
                               next_wake_at, doc, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(saga.saga_id.0)
        .bind(saga.payment_id.0)
        .bind(&saga.tenant_id)
        .bind(format!("{:?}", saga.status))
        .bind(saga.dead_lettered)
        .bind(saga.next_wake_at())
        .bind(serde_json::to_value(saga)?)
        .bind(saga.created_at)
        .bind(saga.updated_at)
        .execute(&mut *tx)
        .await?;

        Self::append_events(&mut tx, events).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        tenant: &TenantContext,
        key: &IdempotencyKey,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query(
            "SELECT doc FROM payments WHERE tenant_id = $1 AND idempotency_key = $2",
        )
        .bind(&tenant.tenant_id)
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::payment_from_row).transpose()
    }

    async fn get(&self, tenant: &TenantContext, id: PaymentId) -> Result<Option<Payment>> {
        let row = sqlx::query("SELECT doc FROM payments WHERE tenant_id = $1 AND payment_id = $2")
            .bind(&tenant.tenant_id)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::payment_from_row).transpose()
    }

    async fn update_status(
        &self,
        tenant: &TenantContext,
        id: PaymentId,
        status: PaymentStatus,
        reason: Option<ReasonCode>,
        events: Vec<OutboxEvent>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT doc FROM payments WHERE tenant_id = $1 AND payment_id = $2 FOR UPDATE")
            .bind(&tenant.tenant_id)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let mut payment = match row.as_ref().map(Self::payment_from_row).transpose()? {
            Some(p) => p,
            None => return Err(Error::Conflict(format!("payment {} not found", id))),
        };

        payment.status = status;
        if reason.is_some() {
            payment.failure_reason = reason;
        }
        payment.updated_at = Utc::now();

        sqlx::query(
            "UPDATE payments SET status = $3, doc = $4, updated_at = $5 WHERE tenant_id = $1 AND payment_id = $2",
        )
        .bind(&tenant.tenant_id)
        .bind(id.0)
        .bind(format!("{}", payment.status))
        .bind(serde_json::to_value(&payment)?)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await?;

        Self::append_events(&mut tx, events).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SagaStore for PgStore {
    async fn load(&self, saga_id: SagaId) -> Result<Option<Saga>> {
        let row = sqlx::query(
            "SELECT doc, lock_token, lease_deadline FROM sagas WHERE saga_id = $1",
        )
        .bind(saga_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::saga_from_row).transpose()
    }

    async fn load_by_payment(
        &self,
        tenant: &TenantContext,
        payment_id: PaymentId,
    ) -> Result<Option<Saga>> {
        let row = sqlx::query(
            "SELECT doc, lock_token, lease_deadline FROM sagas WHERE tenant_id = $1 AND payment_id = $2",
        )
        .bind(&tenant.tenant_id)
        .bind(payment_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::saga_from_row).transpose()
    }

    async fn try_acquire_lease(
        &self,
        saga_id: SagaId,
        token: Uuid,
        lease: Duration,
    ) -> Result<Option<Saga>> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            UPDATE sagas
            SET lock_token = $2, lease_deadline = $3, updated_at = $4
            WHERE saga_id = $1
              AND status IN ('Running', 'Compensating')
              AND (lock_token IS NULL OR lease_deadline IS NULL OR lease_deadline <= $4)
            RETURNING doc, lock_token, lease_deadline
            "#,
        )
        .bind(saga_id.0)
        .bind(token)
        .bind(now + lease)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::saga_from_row).transpose()
    }

    async fn heartbeat(&self, saga_id: SagaId, token: Uuid, lease: Duration) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE sagas SET lease_deadline = $3 WHERE saga_id = $1 AND lock_token = $2",
        )
        .bind(saga_id.0)
        .bind(token)
        .bind(Utc::now() + lease)
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() == 1)
    }

    async fn persist(&self, saga: &Saga, token: Uuid, events: Vec<OutboxEvent>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE sagas
            SET status = $3, dead_lettered = $4, next_wake_at = $5, doc = $6,
                lock_token = $7, lease_deadline = $8, updated_at = $9
            WHERE saga_id = $1 AND lock_token = $2
            "#,
        )
        .bind(saga.saga_id.0)
        .bind(token)
        .bind(format!("{:?}", saga.status))
        .bind(saga.dead_lettered)
        .bind(saga.next_wake_at())
        .bind(serde_json::to_value(saga)?)
        .bind(saga.lock_token)
        .bind(saga.lease_deadline)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::LeaseLost(saga.saga_id.to_string()));
        }

        Self::append_events(&mut tx, events).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn release_lease(&self, saga_id: SagaId, token: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE sagas SET lock_token = NULL, lease_deadline = NULL WHERE saga_id = $1 AND lock_token = $2",
        )
        .bind(saga_id.0)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<SagaId>> {
        let rows = sqlx::query(
            r#"
            SELECT saga_id FROM sagas
            WHERE status IN ('Running', 'Compensating')
              AND (lock_token IS NULL OR lease_deadline IS NULL OR lease_deadline <= $1)
              AND (next_wake_at IS NULL OR next_wake_at <= $1)
            ORDER BY updated_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(SagaId(row.try_get("saga_id")?)))
            .collect()
    }

    async fn request_cancel(
        &self,
        tenant: &TenantContext,
        payment_id: PaymentId,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"
            SELECT doc, lock_token, lease_deadline FROM sagas
            WHERE tenant_id = $1 AND payment_id = $2 AND status IN ('Running', 'Compensating')
            FOR UPDATE
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(payment_id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let mut saga = match row.as_ref().map(Self::saga_from_row).transpose()? {
            Some(s) => s,
            None => return Ok(false),
        };
        saga.cancel_requested = true;
        saga.updated_at = Utc::now();

        sqlx::query("UPDATE sagas SET doc = $2, updated_at = $3 WHERE saga_id = $1")
            .bind(saga.saga_id.0)
            .bind(serde_json::to_value(&saga)?)
            .bind(saga.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn dead_lettered(&self, tenant: &TenantContext) -> Result<Vec<Saga>> {
        let rows = sqlx::query(
            "SELECT doc, lock_token, lease_deadline FROM sagas WHERE tenant_id = $1 AND dead_lettered = TRUE",
        )
        .bind(&tenant.tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::saga_from_row).collect()
    }
}

#[async_trait]
impl OutboxStore for PgStore {
    async fn unpublished(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, topic, aggregate_id, tenant_id, sequence, payload, created_at, published_at
            FROM outbox
            WHERE published_at IS NULL
            ORDER BY aggregate_id, sequence
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OutboxRecord {
                    id: row.try_get("id")?,
                    topic: row.try_get("topic")?,
                    aggregate_id: row.try_get("aggregate_id")?,
                    tenant_id: row.try_get("tenant_id")?,
                    sequence: row.try_get::<i64, _>("sequence")? as u64,
                    payload: row.try_get("payload")?,
                    created_at: row.try_get("created_at")?,
                    published_at: row.try_get("published_at")?,
                })
            })
            .collect()
    }

    async fn mark_published(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE outbox SET published_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn backlog(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM outbox WHERE published_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")? as usize)
    }
}

#[async_trait]
impl UetrIndex for PgStore {
    async fn resolve(&self, uetr: &Uetr) -> Result<Option<(String, PaymentId)>> {
        let row = sqlx::query("SELECT tenant_id, payment_id FROM uetr_index WHERE uetr = $1")
            .bind(uetr.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok((
                row.try_get("tenant_id")?,
                PaymentId(row.try_get("payment_id")?),
            ))
        })
        .transpose()
    }
}

#[async_trait]
impl ClearingResultStore for PgStore {
    async fn put_result(&self, record: ClearingResultRecord) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO clearing_results (uetr, tenant_id, accepted, rail_status, reason_code, received_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (uetr) DO UPDATE
                SET accepted = EXCLUDED.accepted,
                    rail_status = EXCLUDED.rail_status,
                    reason_code = EXCLUDED.reason_code,
                    received_at = EXCLUDED.received_at
                WHERE clearing_results.received_at < EXCLUDED.received_at - ($7 || ' hours')::interval
            "#,
        )
        .bind(record.uetr.as_str())
        .bind(&record.tenant_id)
        .bind(record.accepted)
        .bind(&record.rail_status)
        .bind(&record.reason_code)
        .bind(record.received_at)
        .bind(CALLBACK_DEDUPE_WINDOW_HOURS.to_string())
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() == 1)
    }

    async fn get_result(
        &self,
        tenant: &TenantContext,
        uetr: &Uetr,
    ) -> Result<Option<ClearingResultRecord>> {
        let row = sqlx::query(
            r#"
            SELECT uetr, tenant_id, accepted, rail_status, reason_code, received_at
            FROM clearing_results
            WHERE tenant_id = $1 AND uetr = $2
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(uetr.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(ClearingResultRecord {
                uetr: Uetr::parse(row.try_get("uetr")?)
                    .map_err(|e| Error::Database(e.to_string()))?,
                tenant_id: row.try_get("tenant_id")?,
                accepted: row.try_get("accepted")?,
                rail_status: row.try_get("rail_status")?,
                reason_code: row.try_get("reason_code")?,
                received_at: row.try_get("received_at")?,
            })
        })
        .transpose()
    }
}
