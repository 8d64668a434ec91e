//! Outbox records
//!
//! Domain events are written in the same transaction as the state change
//! that produced them; a publisher worker drains them to the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event as produced by a state-changing operation. The store assigns id,
/// per-aggregate sequence and timestamp when the row is written.
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    /// Destination topic
    pub topic: String,
    /// Aggregate the event belongs to (payment id, saga id)
    pub aggregate_id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Event payload
    pub payload: serde_json::Value,
}

impl OutboxEvent {
    /// Build an event
    pub fn new(
        topic: impl Into<String>,
        aggregate_id: impl Into<String>,
        tenant_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            topic: topic.into(),
            aggregate_id: aggregate_id.into(),
            tenant_id: tenant_id.into(),
            payload,
        }
    }
}

/// Persisted outbox row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRecord {
    /// Row id, doubles as the published event id
    pub id: Uuid,
    /// Destination topic
    pub topic: String,
    /// Aggregate id
    pub aggregate_id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Per-aggregate sequence, 1-based
    pub sequence: u64,
    /// Event payload
    pub payload: serde_json::Value,
    /// Written timestamp
    pub created_at: DateTime<Utc>,
    /// Set once handed to the broker
    pub published_at: Option<DateTime<Utc>>,
}
