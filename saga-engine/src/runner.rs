//! Background saga runner
//!
//! Polls the store for due sagas and advances them with bounded
//! concurrency. Multiple runner processes are safe: the lease CAS makes
//! concurrent advancement of one saga impossible.

use crate::{AdvanceResult, SagaEngine};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use store::SagaStore;
use tracing::{error, info};

/// Runner tuning
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Poll interval when nothing is due
    pub poll_interval: Duration,
    /// Sagas picked up per cycle
    pub batch_size: usize,
    /// Concurrent advancements
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 50,
            concurrency: 8,
        }
    }
}

/// Saga runner
pub struct SagaRunner {
    engine: Arc<SagaEngine>,
    sagas: Arc<dyn SagaStore>,
    config: RunnerConfig,
}

impl SagaRunner {
    /// Create a runner
    pub fn new(engine: Arc<SagaEngine>, sagas: Arc<dyn SagaStore>, config: RunnerConfig) -> Self {
        Self { engine, sagas, config }
    }

    /// Run until the shutdown signal fires
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!("Saga runner started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Saga runner stopping");
                    return;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.tick().await;
                }
            }
        }
    }

    /// One scheduling cycle; public so tests can pump the runner directly
    pub async fn tick(&self) -> usize {
        let due = match self.sagas.due(Utc::now(), self.config.batch_size).await {
            Ok(due) => due,
            Err(e) => {
                error!("Due-saga scan failed: {}", e);
                return 0;
            }
        };
        if due.is_empty() {
            return 0;
        }

        let advanced = stream::iter(due)
            .map(|saga_id| {
                let engine = self.engine.clone();
                async move {
                    match engine.advance(saga_id).await {
                        Ok(AdvanceResult::Advanced) => 1usize,
                        Ok(_) => 0,
                        Err(e) => {
                            error!(saga_id = %saga_id, "Advance failed: {}", e);
                            0
                        }
                    }
                }
            })
            .buffer_unordered(self.config.concurrency)
            .fold(0usize, |acc, n| async move { acc + n })
            .await;

        advanced
    }
}
