//! In-memory store
//!
//! Single-process implementation of every store trait behind one `RwLock`,
//! which gives the same all-or-nothing semantics per call as a database
//! transaction. Used by tests and single-node dev runs.

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
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    /// Payments by (tenant_id, payment_id)
    payments: HashMap<(String, Uuid), Payment>,
    /// Idempotency index: (tenant_id, key) -> payment_id
    idempotency: HashMap<(String, String), PaymentId>,
    /// Sagas by id
    sagas: HashMap<Uuid, Saga>,
    /// payment_id -> saga_id
    saga_by_payment: HashMap<Uuid, SagaId>,
    /// Outbox rows in write order
    outbox: Vec<OutboxRecord>,
    /// Per-aggregate sequence counters
    sequences: HashMap<String, u64>,
    /// UETR -> (tenant_id, payment_id)
    uetr_index: HashMap<String, (String, PaymentId)>,
    /// Clearing results by UETR
    clearing_results: HashMap<String, ClearingResultRecord>,
}

impl Inner {
    fn append_events(&mut self, events: Vec<OutboxEvent>) {
        for event in events {
            let seq = self
                .sequences
                .entry(event.aggregate_id.clone())
                .or_insert(0);
            *seq += 1;
            self.outbox.push(OutboxRecord {
                id: Uuid::new_v4(),
                topic: event.topic,
                aggregate_id: event.aggregate_id,
                tenant_id: event.tenant_id,
                sequence: *seq,
                payload: event.payload,
                created_at: Utc::now(),
                published_at: None,
            });
        }
    }
}

/// In-memory store
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total outbox rows ever written (test introspection)
    pub async fn outbox_len(&self) -> usize {
        self.inner.read().await.outbox.len()
    }

    /// Snapshot of all outbox rows (test introspection)
    pub async fn outbox_rows(&self) -> Vec<OutboxRecord> {
        self.inner.read().await.outbox.clone()
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn create_payment(
        &self,
        payment: &Payment,
        saga: &Saga,
        events: Vec<OutboxEvent>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        let idem_key = (
            payment.tenant.tenant_id.clone(),
            payment.idempotency_key.as_str().to_string(),
        );
        if inner.idempotency.contains_key(&idem_key) {
            return Err(Error::Conflict(format!(
                "idempotency key {} already accepted",
                payment.idempotency_key
            )));
        }
        if inner.uetr_index.contains_key(payment.uetr.as_str()) {
            return Err(Error::Conflict(format!("UETR {} already indexed", payment.uetr)));
        }

        inner.idempotency.insert(idem_key, payment.payment_id);
        inner.uetr_index.insert(
            payment.uetr.as_str().to_string(),
            (payment.tenant.tenant_id.clone(), payment.payment_id),
        );
        inner.payments.insert(
            (payment.tenant.tenant_id.clone(), payment.payment_id.0),
            payment.clone(),
        );
        inner.sagas.insert(saga.saga_id.0, saga.clone());
        inner.saga_by_payment.insert(payment.payment_id.0, saga.saga_id);
        inner.append_events(events);
        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        tenant: &TenantContext,
        key: &IdempotencyKey,
    ) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        let payment_id = match inner
            .idempotency
            .get(&(tenant.tenant_id.clone(), key.as_str().to_string()))
        {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(inner
            .payments
            .get(&(tenant.tenant_id.clone(), payment_id.0))
            .cloned())
    }

    async fn get(&self, tenant: &TenantContext, id: PaymentId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner.payments.get(&(tenant.tenant_id.clone(), id.0)).cloned())
    }

    async fn update_status(
        &self,
        tenant: &TenantContext,
        id: PaymentId,
        status: PaymentStatus,
        reason: Option<ReasonCode>,
        events: Vec<OutboxEvent>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let payment = inner
            .payments
            .get_mut(&(tenant.tenant_id.clone(), id.0))
            .ok_or_else(|| Error::Conflict(format!("payment {} not found", id)))?;
        payment.status = status;
        if reason.is_some() {
            payment.failure_reason = reason;
        }
        payment.updated_at = Utc::now();
        inner.append_events(events);
        Ok(())
    }
}

#[async_trait]
impl SagaStore for MemoryStore {
    async fn load(&self, saga_id: SagaId) -> Result<Option<Saga>> {
        Ok(self.inner.read().await.sagas.get(&saga_id.0).cloned())
    }

    async fn load_by_payment(
        &self,
        tenant: &TenantContext,
        payment_id: PaymentId,
    ) -> Result<Option<Saga>> {
        let inner = self.inner.read().await;
        let saga_id = match inner.saga_by_payment.get(&payment_id.0) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(inner
            .sagas
            .get(&saga_id.0)
            .filter(|s| s.tenant_id == tenant.tenant_id)
            .cloned())
    }

    async fn try_acquire_lease(
        &self,
        saga_id: SagaId,
        token: Uuid,
        lease: Duration,
    ) -> Result<Option<Saga>> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let saga = match inner.sagas.get_mut(&saga_id.0) {
            Some(s) => s,
            None => return Ok(None),
        };
        if saga.status.is_terminal() || !saga.lease_available(now) {
            return Ok(None);
        }
        saga.lock_token = Some(token);
        saga.lease_deadline = Some(now + lease);
        saga.updated_at = now;
        Ok(Some(saga.clone()))
    }

    async fn heartbeat(&self, saga_id: SagaId, token: Uuid, lease: Duration) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.sagas.get_mut(&saga_id.0) {
            Some(saga) if saga.lock_token == Some(token) => {
                saga.lease_deadline = Some(Utc::now() + lease);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn persist(&self, saga: &Saga, token: Uuid, events: Vec<OutboxEvent>) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.sagas.get(&saga.saga_id.0) {
            Some(stored) if stored.lock_token == Some(token) => {}
            _ => return Err(Error::LeaseLost(saga.saga_id.to_string())),
        }
        inner.sagas.insert(saga.saga_id.0, saga.clone());
        inner.append_events(events);
        Ok(())
    }

    async fn release_lease(&self, saga_id: SagaId, token: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(saga) = inner.sagas.get_mut(&saga_id.0) {
            if saga.lock_token == Some(token) {
                saga.lock_token = None;
                saga.lease_deadline = None;
            }
        }
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<SagaId>> {
        let inner = self.inner.read().await;
        let mut due: Vec<&Saga> = inner
            .sagas
            .values()
            .filter(|s| !s.status.is_terminal() && s.lease_available(now))
            .filter(|s| s.next_wake_at().map(|t| t <= now).unwrap_or(true))
            .collect();
        due.sort_by_key(|s| s.updated_at);
        Ok(due.into_iter().take(limit).map(|s| s.saga_id).collect())
    }

    async fn request_cancel(
        &self,
        tenant: &TenantContext,
        payment_id: PaymentId,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let saga_id = match inner.saga_by_payment.get(&payment_id.0) {
            Some(id) => *id,
            None => return Ok(false),
        };
        match inner.sagas.get_mut(&saga_id.0) {
            Some(saga) if saga.tenant_id == tenant.tenant_id && !saga.status.is_terminal() => {
                saga.cancel_requested = true;
                saga.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn dead_lettered(&self, tenant: &TenantContext) -> Result<Vec<Saga>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sagas
            .values()
            .filter(|s| s.dead_lettered && s.tenant_id == tenant.tenant_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OutboxStore for MemoryStore {
    async fn unpublished(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<OutboxRecord> = inner
            .outbox
            .iter()
            .filter(|r| r.published_at.is_none())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.aggregate_id
                .cmp(&b.aggregate_id)
                .then(a.sequence.cmp(&b.sequence))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn mark_published(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(row) = inner.outbox.iter_mut().find(|r| r.id == id) {
            row.published_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn backlog(&self) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner.outbox.iter().filter(|r| r.published_at.is_none()).count())
    }
}

#[async_trait]
impl UetrIndex for MemoryStore {
    async fn resolve(&self, uetr: &Uetr) -> Result<Option<(String, PaymentId)>> {
        Ok(self.inner.read().await.uetr_index.get(uetr.as_str()).cloned())
    }
}

#[async_trait]
impl ClearingResultStore for MemoryStore {
    async fn put_result(&self, record: ClearingResultRecord) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.clearing_results.get(record.uetr.as_str()) {
            let age = record.received_at - existing.received_at;
            if age < Duration::hours(CALLBACK_DEDUPE_WINDOW_HOURS) {
                return Ok(false);
            }
        }
        inner
            .clearing_results
            .insert(record.uetr.as_str().to_string(), record);
        Ok(true)
    }

    async fn get_result(
        &self,
        tenant: &TenantContext,
        uetr: &Uetr,
    ) -> Result<Option<ClearingResultRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .clearing_results
            .get(uetr.as_str())
            .filter(|r| r.tenant_id == tenant.tenant_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::{Currency, Money, Party, PaymentTypeCode};
    use rust_decimal_macros::dec;

    fn payment(tenant_id: &str, key: &str) -> Payment {
        Payment {
            payment_id: PaymentId::generate(),
            uetr: Uetr::generate(),
            tenant: TenantContext::new(tenant_id),
            amount: Money::new(dec!(100), Currency::ZAR).unwrap(),
            debtor: Party::new("ACC-A"),
            creditor: Party::new("ACC-B"),
            payment_type: PaymentTypeCode::new("RTP"),
            local_instrument: None,
            idempotency_key: IdempotencyKey::new(key),
            original_message_id: "MSG".to_string(),
            end_to_end_id: "E2E".to_string(),
            status: PaymentStatus::Initiated,
            failure_reason: None,
            config_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn saga_for(p: &Payment) -> Saga {
        Saga::new(
            SagaId::generate(),
            p.payment_id,
            p.tenant.tenant_id.clone(),
            &["validate"],
            Utc::now() + Duration::minutes(10),
        )
    }

    fn initiated_event(p: &Payment) -> OutboxEvent {
        OutboxEvent::new(
            "payment.initiated.v1",
            p.payment_id.to_string(),
            p.tenant.tenant_id.clone(),
            serde_json::json!({"paymentId": p.payment_id.to_string()}),
        )
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_conflicts() {
        let store = MemoryStore::new();
        let p1 = payment("T1", "K1");
        store
            .create_payment(&p1, &saga_for(&p1), vec![initiated_event(&p1)])
            .await
            .unwrap();

        let p2 = payment("T1", "K1");
        let err = store
            .create_payment(&p2, &saga_for(&p2), vec![initiated_event(&p2)])
            .await;
        assert!(matches!(err, Err(Error::Conflict(_))));
        // no extra outbox row for the rejected duplicate
        assert_eq!(store.outbox_len().await, 1);
    }

    #[tokio::test]
    async fn test_same_key_different_tenants_are_distinct() {
        let store = MemoryStore::new();
        let p1 = payment("T1", "K1");
        let p2 = payment("T2", "K1");
        store.create_payment(&p1, &saga_for(&p1), vec![]).await.unwrap();
        store.create_payment(&p2, &saga_for(&p2), vec![]).await.unwrap();

        // Cross-tenant read sees nothing
        let t2 = TenantContext::new("T2");
        assert!(store.get(&t2, p1.payment_id).await.unwrap().is_none());
        assert!(store.get(&t2, p2.payment_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lease_cas_excludes_second_worker() {
        let store = MemoryStore::new();
        let p = payment("T1", "K1");
        let saga = saga_for(&p);
        store.create_payment(&p, &saga, vec![]).await.unwrap();

        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let lease = Duration::seconds(30);

        assert!(store.try_acquire_lease(saga.saga_id, w1, lease).await.unwrap().is_some());
        assert!(store.try_acquire_lease(saga.saga_id, w2, lease).await.unwrap().is_none());

        // Holder persists fine; the other worker cannot
        let held = store.load(saga.saga_id).await.unwrap().unwrap();
        assert!(store.persist(&held, w1, vec![]).await.is_ok());
        assert!(matches!(
            store.persist(&held, w2, vec![]).await,
            Err(Error::LeaseLost(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimable() {
        let store = MemoryStore::new();
        let p = payment("T1", "K1");
        let saga = saga_for(&p);
        store.create_payment(&p, &saga, vec![]).await.unwrap();

        let w1 = Uuid::new_v4();
        store
            .try_acquire_lease(saga.saga_id, w1, Duration::seconds(-1))
            .await
            .unwrap()
            .unwrap();

        let w2 = Uuid::new_v4();
        assert!(store
            .try_acquire_lease(saga.saga_id, w2, Duration::seconds(30))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_outbox_ordered_per_aggregate() {
        let store = MemoryStore::new();
        let p = payment("T1", "K1");
        store
            .create_payment(
                &p,
                &saga_for(&p),
                vec![initiated_event(&p), initiated_event(&p)],
            )
            .await
            .unwrap();

        let rows = store.unpublished(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sequence, 1);
        assert_eq!(rows[1].sequence, 2);

        store.mark_published(rows[0].id).await.unwrap();
        assert_eq!(store.backlog().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clearing_result_dedupe_window() {
        let store = MemoryStore::new();
        let uetr = Uetr::generate();
        let record = ClearingResultRecord {
            uetr: uetr.clone(),
            tenant_id: "T1".to_string(),
            accepted: true,
            rail_status: "ACCP".to_string(),
            reason_code: None,
            received_at: Utc::now(),
        };

        assert!(store.put_result(record.clone()).await.unwrap());
        // replayed callback inside the window is dropped
        assert!(!store.put_result(record.clone()).await.unwrap());

        let t1 = TenantContext::new("T1");
        let t2 = TenantContext::new("T2");
        assert!(store.get_result(&t1, &uetr).await.unwrap().is_some());
        assert!(store.get_result(&t2, &uetr).await.unwrap().is_none());
    }
}
