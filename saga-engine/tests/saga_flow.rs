//! End-to-end saga flows over the in-memory store with scripted adapters

use adapters::{
    AdapterRegistry, Capabilities, ClearingAdapter, ClearingOutcome, Error as AdapterError,
    FraudClient, FraudScore, LedgerClient,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use event_bus::topics;
use iso20022::camt::CancelOutcome;
use payment_core::{
    Currency, IdempotencyKey, Money, Party, Payment, PaymentId, PaymentStatus, PaymentTypeCode,
    ReasonCode, Saga, SagaId, SagaStatus, StepStatus, TenantContext, Uetr,
};
use routing::{AlwaysAvailable, RoutingResolver};
use rust_decimal_macros::dec;
use saga_engine::{step_names, AdvanceResult, EngineConfig, EngineDeps, SagaEngine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use store::{
    ClearingResultRecord, ClearingResultStore, MemoryStore, OutboxEvent, PaymentStore, SagaStore,
};
use tenant_config::{
    AuthConfig, CircuitBreakerSettings, ClearingAdapterConfig, ConfigStore, PaymentTypeConfig,
    Rail, RateLimitSettings, ResponseMode, RetryPolicy, RoutingRule, TenantConfig, TenantStatus,
    TimeoutConfig,
};

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockLedger {
    holds: Mutex<Vec<String>>,
    releases: Mutex<Vec<String>>,
    posts: Mutex<Vec<String>>,
    reverses: Mutex<Vec<String>>,
    hold_calls: AtomicU32,
    reject_insufficient: std::sync::atomic::AtomicBool,
}

impl MockLedger {
    fn record(entries: &Mutex<Vec<String>>, key: &str) {
        let mut entries = entries.lock().unwrap();
        // idempotent on the key, like the real ledger contract
        if !entries.iter().any(|k| k == key) {
            entries.push(key.to_string());
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn place_hold(&self, payment: &Payment, key: &str) -> adapters::Result<()> {
        self.hold_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_insufficient.load(Ordering::SeqCst) {
            return Err(AdapterError::InsufficientFunds {
                account: payment.debtor.account.clone(),
            });
        }
        Self::record(&self.holds, key);
        Ok(())
    }

    async fn release_hold(&self, _payment: &Payment, key: &str) -> adapters::Result<()> {
        Self::record(&self.releases, key);
        Ok(())
    }

    async fn post(&self, _payment: &Payment, key: &str) -> adapters::Result<()> {
        Self::record(&self.posts, key);
        Ok(())
    }

    async fn reverse(&self, _payment: &Payment, key: &str) -> adapters::Result<()> {
        Self::record(&self.reverses, key);
        Ok(())
    }
}

struct MockFraud {
    score: AtomicU32,
}

#[async_trait]
impl FraudClient for MockFraud {
    async fn score(&self, _payment: &Payment) -> adapters::Result<FraudScore> {
        Ok(FraudScore {
            score: self.score.load(Ordering::SeqCst),
            factors: vec![],
        })
    }
}

#[derive(Clone, Debug)]
enum Script {
    Settled,
    Accepted(&'static str),
    Rejected(&'static str),
    Unavailable,
}

struct ScriptedAdapter {
    id: String,
    rail: Rail,
    supports_cancel: bool,
    default_script: Script,
    submit_calls: AtomicU32,
    cancel_calls: AtomicU32,
}

impl ScriptedAdapter {
    fn new(id: &str, rail: Rail, supports_cancel: bool, default_script: Script) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            rail,
            supports_cancel,
            default_script,
            submit_calls: AtomicU32::new(0),
            cancel_calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ClearingAdapter for ScriptedAdapter {
    fn adapter_id(&self) -> &str {
        &self.id
    }

    fn rail(&self) -> Rail {
        self.rail
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_cancel: self.supports_cancel,
            synchronous: matches!(self.default_script, Script::Settled),
        }
    }

    async fn submit(&self, _payment: &Payment) -> adapters::Result<ClearingOutcome> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        match self.default_script.clone() {
            Script::Settled => Ok(ClearingOutcome::Settled),
            Script::Accepted(tracking) => Ok(ClearingOutcome::Accepted {
                tracking_ref: tracking.to_string(),
            }),
            Script::Rejected(reason) => Ok(ClearingOutcome::Rejected {
                reason_code: reason.to_string(),
            }),
            Script::Unavailable => Err(AdapterError::CircuitOpen {
                adapter_id: self.id.clone(),
            }),
        }
    }

    async fn cancel(&self, _payment: &Payment) -> adapters::Result<CancelOutcome> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CancelOutcome::Cancelled)
    }

    async fn poll(&self, _payment: &Payment) -> adapters::Result<ClearingOutcome> {
        Ok(ClearingOutcome::Settled)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    store: MemoryStore,
    engine: Arc<SagaEngine>,
    ledger: Arc<MockLedger>,
    fraud: Arc<MockFraud>,
}

fn adapter_config(id: &str, rail: Rail) -> ClearingAdapterConfig {
    ClearingAdapterConfig {
        adapter_id: id.to_string(),
        tenant_id: "T1".to_string(),
        rail,
        base_url: "https://gw.example".to_string(),
        endpoint_path: "/submit".to_string(),
        base_url_override: None,
        http_method: "POST".to_string(),
        request_headers: HashMap::new(),
        query_params: HashMap::new(),
        auth: AuthConfig::None,
        timeout_ms: 1_000,
        retries: RetryPolicy::default(),
        circuit_breaker: CircuitBreakerSettings::default(),
        rate_limit: RateLimitSettings::default(),
        payload_mappings: Vec::new(),
    }
}

fn tenant_config(adapter_ids: &[(&str, Rail)], route_rule: Option<Vec<&str>>) -> TenantConfig {
    let mut payment_types = HashMap::new();
    payment_types.insert(
        "RTP".to_string(),
        PaymentTypeConfig {
            code: "RTP".to_string(),
            is_synchronous: true,
            response_mode: ResponseMode::Synchronous,
            kafka_response: None,
            max_amount: Some(dec!(1000000)),
            processing_fee: None,
            timeouts: TimeoutConfig::default(),
            default_adapter: None,
        },
    );

    let mut clearing_adapters = HashMap::new();
    for (id, rail) in adapter_ids {
        clearing_adapters.insert(id.to_string(), adapter_config(id, *rail));
    }

    let routing_rules = route_rule
        .map(|adapters| {
            vec![RoutingRule {
                payment_type: Some("RTP".to_string()),
                adapters: adapters.into_iter().map(str::to_string).collect(),
                ..Default::default()
            }]
        })
        .unwrap_or_default();

    TenantConfig {
        tenant_id: "T1".to_string(),
        status: TenantStatus::Active,
        payment_types,
        clearing_adapters,
        routing_rules,
        fraud: Default::default(),
        blocked_counterparties: Vec::new(),
        feature_flags: HashMap::new(),
        callback: None,
        default_adapter: None,
    }
}

async fn harness(config: TenantConfig, adapters: Vec<Arc<ScriptedAdapter>>) -> Harness {
    let store = MemoryStore::new();
    let config_store = Arc::new(ConfigStore::new());
    config_store.publish(config).await;

    let ledger = Arc::new(MockLedger::default());
    let fraud = Arc::new(MockFraud {
        score: AtomicU32::new(10),
    });
    let registry = Arc::new(AdapterRegistry::new());
    for adapter in adapters {
        registry.register("T1", adapter).await;
    }

    let deps = EngineDeps {
        payments: Arc::new(store.clone()),
        sagas: Arc::new(store.clone()),
        clearing_results: Arc::new(store.clone()),
        config: config_store,
        ledger: ledger.clone(),
        fraud: fraud.clone(),
        adapters: registry.clone(),
        resolver: Arc::new(RoutingResolver::new(Arc::new(AlwaysAvailable))),
    };

    let engine_config = EngineConfig {
        backoff_base_ms: 5,
        backoff_cap_ms: 20,
        ..Default::default()
    };

    Harness {
        store,
        engine: Arc::new(SagaEngine::new(deps, engine_config)),
        ledger,
        fraud,
    }
}

async fn accept_payment(harness: &Harness, key: &str) -> (Payment, Saga) {
    accept_payment_of(harness, key, Money::new(dec!(1000.00), Currency::ZAR).unwrap()).await
}

async fn accept_payment_of(harness: &Harness, key: &str, amount: Money) -> (Payment, Saga) {
    let payment = Payment {
        payment_id: PaymentId::generate(),
        uetr: Uetr::generate(),
        tenant: TenantContext::new("T1"),
        amount,
        debtor: Party::new("ACC-A"),
        creditor: Party::new("ACC-B"),
        payment_type: PaymentTypeCode::new("RTP"),
        local_instrument: None,
        idempotency_key: IdempotencyKey::new(key),
        original_message_id: format!("MSG-{}", key),
        end_to_end_id: format!("E2E-{}", key),
        status: PaymentStatus::Initiated,
        failure_reason: None,
        config_version: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let saga = Saga::new(
        SagaId::generate(),
        payment.payment_id,
        "T1",
        &step_names(),
        Utc::now() + ChronoDuration::minutes(10),
    );

    harness
        .store
        .create_payment(
            &payment,
            &saga,
            vec![
                OutboxEvent::new(
                    topics::PAYMENT_INITIATED,
                    payment.payment_id.to_string(),
                    "T1",
                    serde_json::json!({"paymentId": payment.payment_id.to_string()}),
                ),
                OutboxEvent::new(
                    topics::SAGA_STARTED,
                    saga.saga_id.to_string(),
                    "T1",
                    serde_json::json!({"sagaId": saga.saga_id.to_string()}),
                ),
            ],
        )
        .await
        .unwrap();

    (payment, saga)
}

async fn drive(harness: &Harness, saga_id: SagaId) -> AdvanceResult {
    harness
        .engine
        .run_to_completion(saga_id, Duration::from_secs(10))
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_settles_and_orders_events() {
    let rtc = ScriptedAdapter::new("rtc-primary", Rail::Rtc, false, Script::Settled);
    let harness = harness(
        tenant_config(&[("rtc-primary", Rail::Rtc)], None),
        vec![rtc.clone()],
    )
    .await;

    let (payment, saga) = accept_payment(&harness, "K1").await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Completed));

    let tenant = TenantContext::new("T1");
    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Settled);

    let stored_saga = harness.store.load(saga.saga_id).await.unwrap().unwrap();
    assert!(stored_saga
        .steps
        .iter()
        .all(|s| matches!(s.status, StepStatus::Succeeded | StepStatus::Skipped)));

    // Exactly one hold and one post against the payment
    assert_eq!(harness.ledger.hold_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.ledger.holds.lock().unwrap().len(), 1);
    assert_eq!(harness.ledger.posts.lock().unwrap().len(), 1);
    assert!(harness.ledger.releases.lock().unwrap().is_empty());

    // Events on the payment aggregate appear in lifecycle order
    let rows = harness.store.outbox_rows().await;
    let payment_topics: Vec<&str> = rows
        .iter()
        .filter(|r| r.aggregate_id == payment.payment_id.to_string())
        .map(|r| r.topic.as_str())
        .collect();
    let pos = |t: &str| payment_topics.iter().position(|x| *x == t).unwrap();
    assert!(pos(topics::PAYMENT_INITIATED) < pos(topics::PAYMENT_VALIDATED));
    assert!(pos(topics::PAYMENT_VALIDATED) < pos(topics::TRANSACTION_CREATED));
    assert!(pos(topics::TRANSACTION_CREATED) < pos(topics::PAYMENT_COMPLETED));
}

#[tokio::test]
async fn fraud_rejection_fails_payment_with_reason() {
    let rtc = ScriptedAdapter::new("rtc-primary", Rail::Rtc, false, Script::Settled);
    let harness = harness(
        tenant_config(&[("rtc-primary", Rail::Rtc)], None),
        vec![rtc.clone()],
    )
    .await;
    harness.fraud.score.store(95, Ordering::SeqCst);

    let (payment, saga) = accept_payment(&harness, "K4").await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Compensated));

    let tenant = TenantContext::new("T1");
    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.failure_reason, Some(ReasonCode::FraudRejected));

    // Fraud runs before funds reservation, so no hold was ever placed and
    // nothing reached the rail
    assert!(harness.ledger.holds.lock().unwrap().is_empty());
    assert_eq!(rtc.submit_calls.load(Ordering::SeqCst), 0);

    let stored_saga = harness.store.load(saga.saga_id).await.unwrap().unwrap();
    assert!(stored_saga.fully_compensated());
}

#[tokio::test]
async fn clearing_rejection_releases_hold_idempotently() {
    let rtc = ScriptedAdapter::new("rtc-primary", Rail::Rtc, false, Script::Rejected("AC01"));
    let harness = harness(
        tenant_config(&[("rtc-primary", Rail::Rtc)], None),
        vec![rtc.clone()],
    )
    .await;

    let (payment, saga) = accept_payment(&harness, "K5").await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Compensated));

    let tenant = TenantContext::new("T1");
    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.failure_reason, Some(ReasonCode::ClearingRejected));

    // The hold was released with the reservation key; release and hold pair up
    let holds = harness.ledger.holds.lock().unwrap().clone();
    let releases = harness.ledger.releases.lock().unwrap().clone();
    assert_eq!(holds.len(), 1);
    assert_eq!(releases, holds);

    // No posting ever happened, so no reversal either
    assert!(harness.ledger.posts.lock().unwrap().is_empty());
    assert!(harness.ledger.reverses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failover_to_next_candidate_on_unavailability() {
    let primary = ScriptedAdapter::new("rtc-a", Rail::Rtc, false, Script::Unavailable);
    let secondary = ScriptedAdapter::new("rtc-b", Rail::Rtc, false, Script::Settled);
    let harness = harness(
        tenant_config(
            &[("rtc-a", Rail::Rtc), ("rtc-b", Rail::Rtc)],
            Some(vec!["rtc-a", "rtc-b"]),
        ),
        vec![primary.clone(), secondary.clone()],
    )
    .await;

    let (payment, saga) = accept_payment(&harness, "K6").await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Completed));

    assert_eq!(primary.submit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary.submit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(primary.cancel_calls.load(Ordering::SeqCst), 0);

    // UETR unchanged across the failover
    let tenant = TenantContext::new("T1");
    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.uetr, payment.uetr);
    assert_eq!(stored.status, PaymentStatus::Settled);

    let stored_saga = harness.store.load(saga.saga_id).await.unwrap().unwrap();
    assert_eq!(stored_saga.clearing_adapter_id.as_deref(), Some("rtc-b"));
}

#[tokio::test]
async fn retry_budget_is_exact_then_compensation() {
    let flaky = ScriptedAdapter::new("rtc-a", Rail::Rtc, false, Script::Unavailable);
    let harness = harness(
        tenant_config(&[("rtc-a", Rail::Rtc)], Some(vec!["rtc-a"])),
        vec![flaky.clone()],
    )
    .await;

    let (payment, saga) = accept_payment(&harness, "K7").await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Compensated));

    // Exactly the rail-bound retry budget, then terminal
    assert_eq!(flaky.submit_calls.load(Ordering::SeqCst), 3);

    let tenant = TenantContext::new("T1");
    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);

    // The hold placed before submission was released
    let holds = harness.ledger.holds.lock().unwrap().clone();
    let releases = harness.ledger.releases.lock().unwrap().clone();
    assert_eq!(releases, holds);
}

#[tokio::test]
async fn async_rail_parks_until_callback_arrives() {
    let bankserv = ScriptedAdapter::new(
        "bankserv-primary",
        Rail::Bankserv,
        true,
        Script::Accepted("BSV-1"),
    );
    let harness = harness(
        tenant_config(
            &[("bankserv-primary", Rail::Bankserv)],
            Some(vec!["bankserv-primary"]),
        ),
        vec![bankserv.clone()],
    )
    .await;

    let (payment, saga) = accept_payment(&harness, "K8").await;

    // Without a rail callback the saga parks on the await step
    let result = harness
        .engine
        .run_to_completion(saga.saga_id, Duration::from_millis(400))
        .await
        .unwrap();
    assert!(matches!(result, AdvanceResult::Waiting | AdvanceResult::Advanced));

    let parked = harness.store.load(saga.saga_id).await.unwrap().unwrap();
    assert_eq!(parked.status, SagaStatus::Running);
    assert_eq!(parked.tracking_ref.as_deref(), Some("BSV-1"));

    // Inbound pacs.002 recorded against the UETR wakes it
    harness
        .store
        .put_result(ClearingResultRecord {
            uetr: payment.uetr.clone(),
            tenant_id: "T1".to_string(),
            accepted: true,
            rail_status: "ACCP".to_string(),
            reason_code: None,
            received_at: Utc::now(),
        })
        .await
        .unwrap();

    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Completed));

    let tenant = TenantContext::new("T1");
    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Settled);
}

#[tokio::test]
async fn cancel_request_honoured_at_step_boundary() {
    let rtc = ScriptedAdapter::new("rtc-primary", Rail::Rtc, false, Script::Settled);
    let harness = harness(
        tenant_config(&[("rtc-primary", Rail::Rtc)], None),
        vec![rtc.clone()],
    )
    .await;

    let (payment, saga) = accept_payment(&harness, "K9").await;
    let tenant = TenantContext::new("T1");
    assert!(harness
        .store
        .request_cancel(&tenant, payment.payment_id)
        .await
        .unwrap());

    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Compensated));

    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.failure_reason, Some(ReasonCode::Cancelled));

    // Nothing reached the rail
    assert_eq!(rtc.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn held_lease_excludes_other_workers() {
    let rtc = ScriptedAdapter::new("rtc-primary", Rail::Rtc, false, Script::Settled);
    let harness = harness(
        tenant_config(&[("rtc-primary", Rail::Rtc)], None),
        vec![rtc],
    )
    .await;

    let (_, saga) = accept_payment(&harness, "K10").await;

    // Another worker holds a live lease
    let other = uuid::Uuid::new_v4();
    harness
        .store
        .try_acquire_lease(saga.saga_id, other, ChronoDuration::seconds(30))
        .await
        .unwrap()
        .unwrap();

    let result = harness.engine.advance(saga.saga_id).await.unwrap();
    assert_eq!(result, AdvanceResult::Busy);

    // Expired lease is reclaimable and the saga completes
    harness
        .store
        .release_lease(saga.saga_id, other)
        .await
        .unwrap();
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Completed));
}

#[tokio::test]
async fn max_amount_boundary_is_inclusive() {
    let rtc = ScriptedAdapter::new("rtc-primary", Rail::Rtc, false, Script::Settled);
    let harness = harness(
        tenant_config(&[("rtc-primary", Rail::Rtc)], Some(vec!["rtc-primary"])),
        vec![rtc],
    )
    .await;
    let tenant = TenantContext::new("T1");

    // Exactly the configured maximum is accepted
    let at_limit = Money::new(dec!(1000000), Currency::ZAR).unwrap();
    let (payment, saga) = accept_payment_of(&harness, "K12", at_limit).await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Completed));
    let stored = harness.store.get(&tenant, payment.payment_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Settled);

    // One minor unit above fails with a tenant-policy reason
    let over = Money::new(dec!(1000000.0001), Currency::ZAR).unwrap();
    let (payment, saga) = accept_payment_of(&harness, "K13", over).await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Compensated));
    let stored = harness.store.get(&tenant, payment.payment_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.failure_reason, Some(ReasonCode::OverLimit));
}

#[tokio::test]
async fn insufficient_funds_is_terminal_without_rail_traffic() {
    let rtc = ScriptedAdapter::new("rtc-primary", Rail::Rtc, false, Script::Settled);
    let harness = harness(
        tenant_config(&[("rtc-primary", Rail::Rtc)], None),
        vec![rtc.clone()],
    )
    .await;
    harness
        .ledger
        .reject_insufficient
        .store(true, Ordering::SeqCst);

    let (payment, saga) = accept_payment(&harness, "K11").await;
    let result = drive(&harness, saga.saga_id).await;
    assert_eq!(result, AdvanceResult::Terminal(SagaStatus::Compensated));

    let tenant = TenantContext::new("T1");
    let stored = harness
        .store
        .get(&tenant, payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.failure_reason, Some(ReasonCode::InsufficientFunds));
    assert_eq!(rtc.submit_calls.load(Ordering::SeqCst), 0);
    // The hold never succeeded, so there is nothing to release
    assert!(harness.ledger.releases.lock().unwrap().is_empty());
}
