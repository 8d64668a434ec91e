//! Event envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::OutboxRecord;
use uuid::Uuid;

/// Envelope every published event is wrapped in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event id (the outbox row id, stable across republish)
    pub event_id: Uuid,

    /// When the producing state change was committed
    pub occurred_at: DateTime<Utc>,

    /// Owning tenant
    pub tenant_id: String,

    /// Aggregate the event belongs to
    pub aggregate_id: String,

    /// Per-aggregate sequence; consumers dedupe on (aggregate_id, sequence)
    pub sequence: u64,

    /// Envelope schema version
    pub schema_version: u32,

    /// Event payload
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Wrap an outbox record
    pub fn from_outbox(record: &OutboxRecord) -> Self {
        Self {
            event_id: record.id,
            occurred_at: record.created_at,
            tenant_id: record.tenant_id.clone(),
            aggregate_id: record.aggregate_id.clone(),
            sequence: record.sequence,
            schema_version: 1,
            payload: record.payload.clone(),
        }
    }

    /// Serialize to bytes for the broker
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from broker bytes
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_round_trip() {
        let record = OutboxRecord {
            id: Uuid::new_v4(),
            topic: "payment.initiated.v1".to_string(),
            aggregate_id: "agg-1".to_string(),
            tenant_id: "T1".to_string(),
            sequence: 3,
            payload: json!({"paymentId": "p-1"}),
            created_at: Utc::now(),
            published_at: None,
        };

        let envelope = EventEnvelope::from_outbox(&record);
        let bytes = envelope.to_bytes().unwrap();
        let back = EventEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(back.event_id, record.id);
        assert_eq!(back.sequence, 3);
        assert_eq!(back.tenant_id, "T1");
        assert_eq!(back.payload["paymentId"], "p-1");
    }
}
