//! Dead letter queue for undeliverable callback responses
//!
//! Bounded in-memory queue surfaced to operators via the ops endpoint; a
//! copy of each dead letter is also published to the dead-letter topic so
//! external tooling can alert on it.

use crate::metrics::RESPONSE_DLQ_SIZE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// One undeliverable response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Dead letter id
    pub id: Uuid,
    /// Tenant the response belongs to
    pub tenant_id: String,
    /// Payment the pain.002 reports on
    pub payment_id: String,
    /// Callback URL that refused delivery
    pub url: String,
    /// pain.002 XML body
    pub body: String,
    /// Final delivery error
    pub last_error: String,
    /// Delivery attempts made
    pub attempts: u32,
    /// When the response was dead-lettered
    pub created_at: DateTime<Utc>,
}

/// Dead letter queue
pub struct DeadLetterQueue {
    letters: RwLock<VecDeque<DeadLetter>>,
    max_size: usize,
}

impl DeadLetterQueue {
    /// Queue bounded to `max_size`; the oldest letter is dropped on overflow
    pub fn new(max_size: usize) -> Self {
        Self {
            letters: RwLock::new(VecDeque::new()),
            max_size,
        }
    }

    /// Push a dead letter
    pub async fn push(&self, letter: DeadLetter) {
        let mut letters = self.letters.write().await;
        if letters.len() >= self.max_size {
            if let Some(dropped) = letters.pop_front() {
                warn!(
                    "Response DLQ full; dropping oldest dead letter {} for payment {}",
                    dropped.id, dropped.payment_id
                );
            }
        }
        letters.push_back(letter);
        RESPONSE_DLQ_SIZE.set(letters.len() as i64);
    }

    /// Current size
    pub async fn size(&self) -> usize {
        self.letters.read().await.len()
    }

    /// Dead letters for one tenant (ops listing)
    pub async fn for_tenant(&self, tenant_id: &str) -> Vec<DeadLetter> {
        self.letters
            .read()
            .await
            .iter()
            .filter(|l| l.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(tenant: &str) -> DeadLetter {
        DeadLetter {
            id: Uuid::new_v4(),
            tenant_id: tenant.to_string(),
            payment_id: Uuid::new_v4().to_string(),
            url: "https://callback.example/pain002".to_string(),
            body: "<Document/>".to_string(),
            last_error: "503".to_string(),
            attempts: 3,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_bounded_and_tenant_scoped() {
        let dlq = DeadLetterQueue::new(2);
        dlq.push(letter("T1")).await;
        dlq.push(letter("T2")).await;
        dlq.push(letter("T1")).await; // evicts the first T1 letter

        assert_eq!(dlq.size().await, 2);
        assert_eq!(dlq.for_tenant("T1").await.len(), 1);
        assert_eq!(dlq.for_tenant("T2").await.len(), 1);
    }
}
