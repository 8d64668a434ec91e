//! Circuit breaker per clearing adapter
//!
//! Failure rate over a sliding window opens the circuit; after the open
//! interval the breaker half-opens and a run of successes closes it again.

use crate::metrics::CIRCUIT_BREAKER_STATE;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tenant_config::CircuitBreakerSettings;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Closed (normal operation)
    Closed,
    /// Open (rejecting requests)
    Open,
    /// Half-open (probing)
    HalfOpen,
}

impl CircuitState {
    fn gauge_value(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

/// Circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    /// Recent call outcomes inside the sliding window
    window: VecDeque<(DateTime<Utc>, bool)>,
    /// Successes observed while half-open
    half_open_successes: u32,
    /// When the circuit last opened
    opened_at: Option<DateTime<Utc>>,
    config: CircuitBreakerSettings,
}

impl CircuitBreaker {
    /// Create new circuit breaker
    pub fn new(config: CircuitBreakerSettings) -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            half_open_successes: 0,
            opened_at: None,
            config,
        }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let horizon = now - Duration::seconds(self.config.window_seconds as i64);
        while let Some((at, _)) = self.window.front() {
            if *at < horizon {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|(_, ok)| !ok).count();
        failures as f64 / self.window.len() as f64
    }

    /// Whether a request may go out now
    pub fn is_request_allowed(&mut self, adapter_id: &str) -> bool {
        let now = Utc::now();
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let reopen_at = self
                    .opened_at
                    .map(|t| t + Duration::seconds(self.config.open_seconds as i64));
                if reopen_at.map(|t| now >= t).unwrap_or(true) {
                    info!("Circuit breaker half-opening for adapter {}", adapter_id);
                    self.state = CircuitState::HalfOpen;
                    self.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&mut self, adapter_id: &str) {
        let now = Utc::now();
        match self.state {
            CircuitState::Closed => {
                self.window.push_back((now, true));
                self.prune(now);
            }
            CircuitState::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= self.config.half_open_successes {
                    info!("Circuit breaker closing for adapter {}", adapter_id);
                    self.state = CircuitState::Closed;
                    self.window.clear();
                    self.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call
    pub fn record_failure(&mut self, adapter_id: &str) {
        let now = Utc::now();
        match self.state {
            CircuitState::Closed => {
                self.window.push_back((now, false));
                self.prune(now);
                if self.window.len() as u32 >= self.config.minimum_calls
                    && self.failure_rate() >= self.config.failure_rate_threshold
                {
                    warn!(
                        "Circuit breaker opening for adapter {} (failure rate {:.0}% over {} calls)",
                        adapter_id,
                        self.failure_rate() * 100.0,
                        self.window.len()
                    );
                    self.state = CircuitState::Open;
                    self.opened_at = Some(now);
                }
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker re-opening for adapter {}", adapter_id);
                self.state = CircuitState::Open;
                self.opened_at = Some(now);
                self.half_open_successes = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Current state
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Force open (operator action / tests)
    pub fn force_open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Utc::now());
    }
}

/// Circuit breaker manager (per adapter id)
pub struct CircuitBreakerManager {
    breakers: Arc<RwLock<HashMap<String, CircuitBreaker>>>,
    default_config: CircuitBreakerSettings,
}

impl CircuitBreakerManager {
    /// Create new manager
    pub fn new(default_config: CircuitBreakerSettings) -> Self {
        Self {
            breakers: Arc::new(RwLock::new(HashMap::new())),
            default_config,
        }
    }

    /// Whether the adapter may be called now. The adapter's own settings are
    /// used when its breaker is first created.
    pub async fn is_request_allowed(
        &self,
        adapter_id: &str,
        settings: &CircuitBreakerSettings,
    ) -> bool {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers
            .entry(adapter_id.to_string())
            .or_insert_with(|| CircuitBreaker::new(settings.clone()));
        let allowed = breaker.is_request_allowed(adapter_id);
        CIRCUIT_BREAKER_STATE
            .with_label_values(&[adapter_id])
            .set(breaker.state().gauge_value());
        allowed
    }

    /// Record success
    pub async fn record_success(&self, adapter_id: &str) {
        let mut breakers = self.breakers.write().await;
        if let Some(breaker) = breakers.get_mut(adapter_id) {
            breaker.record_success(adapter_id);
            CIRCUIT_BREAKER_STATE
                .with_label_values(&[adapter_id])
                .set(breaker.state().gauge_value());
        }
    }

    /// Record failure
    pub async fn record_failure(&self, adapter_id: &str) {
        let mut breakers = self.breakers.write().await;
        let default_config = self.default_config.clone();
        let breaker = breakers
            .entry(adapter_id.to_string())
            .or_insert_with(|| CircuitBreaker::new(default_config));
        breaker.record_failure(adapter_id);
        CIRCUIT_BREAKER_STATE
            .with_label_values(&[adapter_id])
            .set(breaker.state().gauge_value());
    }

    /// Whether the circuit is open (routing treats open as degraded)
    pub async fn is_open(&self, adapter_id: &str) -> bool {
        let breakers = self.breakers.read().await;
        breakers
            .get(adapter_id)
            .map(|b| b.state() == CircuitState::Open)
            .unwrap_or(false)
    }

    /// Force an adapter's circuit open (tests / operator action)
    pub async fn force_open(&self, adapter_id: &str) {
        let mut breakers = self.breakers.write().await;
        breakers
            .entry(adapter_id.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.default_config.clone()))
            .force_open();
    }
}
