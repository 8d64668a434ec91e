//! Outbox publisher worker
//!
//! Drains unpublished outbox rows in per-aggregate order and hands them to
//! the broker. At-least-once: a crash between publish and mark-published
//! republishes the same event id on restart.

use crate::{
    metrics::{EVENT_PUBLISH_DURATION, EVENT_PUBLISH_TOTAL, OUTBOX_BACKLOG},
    EventBus, EventEnvelope, Result,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::OutboxStore;
use tracing::{error, info, warn};

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Poll interval when the outbox is empty
    pub poll_interval: Duration,

    /// Rows drained per cycle
    pub batch_size: usize,

    /// Max publish attempts per event before the cycle gives up (the row
    /// stays unpublished and is retried next cycle)
    pub max_retry_attempts: u32,

    /// Initial retry delay
    pub initial_retry_delay: Duration,

    /// Retry delay cap
    pub max_retry_delay: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            batch_size: 100,
            max_retry_attempts: 3,
            initial_retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Outbox publisher
pub struct OutboxPublisher {
    outbox: Arc<dyn OutboxStore>,
    bus: Arc<dyn EventBus>,
    config: PublisherConfig,
}

impl OutboxPublisher {
    /// Create a publisher
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        bus: Arc<dyn EventBus>,
        config: PublisherConfig,
    ) -> Self {
        Self { outbox, bus, config }
    }

    /// Run until the shutdown signal fires
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!("Outbox publisher started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Outbox publisher stopping");
                    return;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.drain_once().await {
                        error!("Outbox drain failed: {}", e);
                    }
                }
            }
        }
    }

    /// Drain one batch; public so tests and sync paths can pump the outbox
    /// without the background loop
    pub async fn drain_once(&self) -> Result<usize> {
        let rows = self.outbox.unpublished(self.config.batch_size).await?;
        let drained = rows.len();

        for row in rows {
            let envelope = EventEnvelope::from_outbox(&row);
            let payload = Bytes::from(envelope.to_bytes()?);

            let start = Instant::now();
            let result = self.publish_with_retry(&row.topic, payload).await;
            EVENT_PUBLISH_DURATION
                .with_label_values(&[&row.topic])
                .observe(start.elapsed().as_secs_f64());

            match result {
                Ok(()) => {
                    EVENT_PUBLISH_TOTAL
                        .with_label_values(&[&row.topic, "success"])
                        .inc();
                    self.outbox.mark_published(row.id).await?;
                }
                Err(e) => {
                    EVENT_PUBLISH_TOTAL
                        .with_label_values(&[&row.topic, "error"])
                        .inc();
                    error!(
                        "Failed to publish outbox row {} to {}: {}",
                        row.id, row.topic, e
                    );
                    // Stop the batch so per-aggregate ordering is preserved
                    break;
                }
            }
        }

        OUTBOX_BACKLOG.set(self.outbox.backlog().await? as i64);
        Ok(drained)
    }

    async fn publish_with_retry(&self, topic: &str, payload: Bytes) -> Result<()> {
        let mut attempts = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            attempts += 1;
            match self.bus.publish(topic, payload.clone()).await {
                Ok(()) => {
                    if attempts > 1 {
                        info!("Published to {} after {} attempts", topic, attempts);
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempts >= self.config.max_retry_attempts {
                        return Err(e);
                    }
                    warn!(
                        "Publish to {} failed (attempt {}), retrying in {:?}: {}",
                        topic, attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.max_retry_delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBus;
    use futures::StreamExt;
    use payment_core::{
        Currency, IdempotencyKey, Money, Party, Payment, PaymentId, PaymentStatus,
        PaymentTypeCode, Saga, SagaId, TenantContext, Uetr,
    };
    use store::{MemoryStore, OutboxEvent, PaymentStore};

    fn payment() -> Payment {
        Payment {
            payment_id: PaymentId::generate(),
            uetr: Uetr::generate(),
            tenant: TenantContext::new("T1"),
            amount: Money::new(rust_decimal::Decimal::ONE, Currency::ZAR).unwrap(),
            debtor: Party::new("ACC-A"),
            creditor: Party::new("ACC-B"),
            payment_type: PaymentTypeCode::new("RTP"),
            local_instrument: None,
            idempotency_key: IdempotencyKey::new("K1"),
            original_message_id: "MSG".to_string(),
            end_to_end_id: "E2E".to_string(),
            status: PaymentStatus::Initiated,
            failure_reason: None,
            config_version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn saga_for(p: &Payment) -> Saga {
        Saga::new(
            SagaId::generate(),
            p.payment_id,
            p.tenant.tenant_id.clone(),
            &["validate"],
            chrono::Utc::now() + chrono::Duration::minutes(5),
        )
    }

    #[tokio::test]
    async fn test_drain_publishes_envelopes_in_sequence_order() {
        let store = MemoryStore::new();
        let bus = Arc::new(InMemoryBus::new());
        let mut sub = bus.subscribe("payment.initiated.v1").await.unwrap();

        let p = payment();
        store
            .create_payment(
                &p,
                &saga_for(&p),
                vec![
                    OutboxEvent::new(
                        "payment.initiated.v1",
                        p.payment_id.to_string(),
                        "T1",
                        serde_json::json!({"n": 1}),
                    ),
                    OutboxEvent::new(
                        "payment.initiated.v1",
                        p.payment_id.to_string(),
                        "T1",
                        serde_json::json!({"n": 2}),
                    ),
                ],
            )
            .await
            .unwrap();

        let publisher = OutboxPublisher::new(
            Arc::new(store.clone()),
            bus.clone(),
            PublisherConfig::default(),
        );
        let drained = publisher.drain_once().await.unwrap();
        assert_eq!(drained, 2);

        let first = EventEnvelope::from_bytes(&sub.next().await.unwrap().payload).unwrap();
        let second = EventEnvelope::from_bytes(&sub.next().await.unwrap().payload).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);

        // backlog fully drained, nothing republished
        assert_eq!(publisher.drain_once().await.unwrap(), 0);
    }
}
