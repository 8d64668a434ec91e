//! Bus implementations

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// A message delivered to a subscriber
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Topic it arrived on
    pub topic: String,
    /// Raw payload
    pub payload: Bytes,
}

/// Publish/subscribe facade
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a payload to a topic
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;

    /// Subscribe to a topic (exact match for the in-memory bus; NATS subject
    /// syntax passes through on the NATS bus)
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, ReceivedMessage>>;
}

/// In-process bus backed by broadcast channels, one per topic.
/// Used by tests and single-node runs.
#[derive(Default)]
pub struct InMemoryBus {
    channels: RwLock<HashMap<String, broadcast::Sender<ReceivedMessage>>>,
    capacity: usize,
}

impl InMemoryBus {
    /// Bus with the default per-topic buffer
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: 1024,
        }
    }

    async fn sender(&self, topic: &str) -> broadcast::Sender<ReceivedMessage> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity.max(16)).0)
            .clone()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        let sender = self.sender(topic).await;
        // No subscribers is fine; the channel drops the message
        let _ = sender.send(ReceivedMessage {
            topic: topic.to_string(),
            payload,
        });
        debug!(topic, "Published message on in-memory bus");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, ReceivedMessage>> {
        let receiver = self.sender(topic).await.subscribe();
        Ok(BroadcastStream::new(receiver)
            .filter_map(|item| async move { item.ok() })
            .boxed())
    }
}

/// NATS-backed bus
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to a NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(topic.to_string(), payload)
            .await
            .map_err(|e| Error::Publish(e.to_string()))?;
        self.client
            .flush()
            .await
            .map_err(|e| Error::Publish(format!("flush failed: {}", e)))?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, ReceivedMessage>> {
        let subscriber = self
            .client
            .subscribe(topic.to_string())
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;
        Ok(subscriber
            .map(|msg| ReceivedMessage {
                topic: msg.subject.to_string(),
                payload: msg.payload,
            })
            .boxed())
    }
}

/// Shared handle used across the engine
pub type SharedBus = Arc<dyn EventBus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_publish_subscribe() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe("payment.initiated.v1").await.unwrap();

        bus.publish("payment.initiated.v1", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let msg = sub.next().await.unwrap();
        assert_eq!(msg.topic, "payment.initiated.v1");
        assert_eq!(&msg.payload[..], b"{}");
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe("a").await.unwrap();
        bus.publish("b", Bytes::from_static(b"x")).await.unwrap();
        bus.publish("a", Bytes::from_static(b"y")).await.unwrap();

        let msg = sub.next().await.unwrap();
        assert_eq!(&msg.payload[..], b"y");
    }
}
