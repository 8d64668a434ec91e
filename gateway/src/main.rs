//! PayRail gateway binary
//!
//! Wires stores, bus, adapters, saga engine, dispatcher and background
//! workers, then serves the HTTP API.

use adapters::auth::TokenCache;
use adapters::circuit_breaker::CircuitBreakerManager;
use adapters::fraud::{FraudConfig, HttpFraudClient};
use adapters::framework::RailInfra;
use adapters::ledger::{HttpLedgerClient, LedgerConfig};
use adapters::rails;
use adapters::rate_limit::RateLimiterRegistry;
use adapters::AdapterRegistry;
use anyhow::Context;
use event_bus::{EventBus, InMemoryBus, NatsBus, OutboxPublisher, PublisherConfig};
use payrail_gateway::config::GatewayConfig;
use payrail_gateway::state::{AppState, CircuitProbe};
use payrail_gateway::{response_worker, router};
use response_dispatcher::{DeadLetterQueue, DispatcherConfig, ResponseDispatcher};
use routing::RoutingResolver;
use saga_engine::{EngineConfig, EngineDeps, RunnerConfig, SagaEngine, SagaRunner};
use std::sync::Arc;
use store::{
    ClearingResultStore, MemoryStore, OutboxStore, PaymentStore, PgStore, SagaStore, UetrIndex,
};
use tenant_config::{CircuitBreakerSettings, ConfigStore};
use tracing::info;

struct Backing {
    payments: Arc<dyn PaymentStore>,
    sagas: Arc<dyn SagaStore>,
    outbox: Arc<dyn OutboxStore>,
    uetr: Arc<dyn UetrIndex>,
    clearing: Arc<dyn ClearingResultStore>,
}

impl Backing {
    fn memory() -> Self {
        let store = MemoryStore::new();
        Self {
            payments: Arc::new(store.clone()),
            sagas: Arc::new(store.clone()),
            outbox: Arc::new(store.clone()),
            uetr: Arc::new(store.clone()),
            clearing: Arc::new(store),
        }
    }

    fn postgres(store: PgStore) -> Self {
        Self {
            payments: Arc::new(store.clone()),
            sagas: Arc::new(store.clone()),
            outbox: Arc::new(store.clone()),
            uetr: Arc::new(store.clone()),
            clearing: Arc::new(store),
        }
    }
}

fn config_path_from_args() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    info!("Starting PayRail gateway");
    let config = GatewayConfig::load(config_path_from_args().as_deref())?;

    // Persistence
    let backing = match &config.database_url {
        Some(url) => {
            info!("Connecting to Postgres");
            Backing::postgres(PgStore::connect(url, config.db_max_connections).await?)
        }
        None => {
            info!("No DATABASE_URL configured; using in-memory stores");
            Backing::memory()
        }
    };

    // Broker
    let bus: Arc<dyn EventBus> = match &config.nats_url {
        Some(url) => {
            info!("Connecting to NATS: {}", url);
            Arc::new(NatsBus::connect(url).await?)
        }
        None => {
            info!("No NATS_URL configured; using the in-process bus");
            Arc::new(InMemoryBus::new())
        }
    };

    // Tenant configuration
    let config_store = Arc::new(ConfigStore::new());
    if let Some(path) = &config.tenants_file {
        config_store
            .load_file(path)
            .await
            .with_context(|| format!("loading tenants from {}", path))?;
    }

    // Adapter layer
    let breakers = Arc::new(CircuitBreakerManager::new(CircuitBreakerSettings::default()));
    let infra = RailInfra {
        breakers: breakers.clone(),
        limiters: Arc::new(RateLimiterRegistry::new()),
        tokens: Arc::new(TokenCache::new()),
    };
    let registry = Arc::new(AdapterRegistry::new());
    for tenant_id in config_store.tenant_ids().await {
        let snapshot = config_store.latest(&tenant_id).await?;
        for adapter_config in snapshot.config.clearing_adapters.values() {
            let adapter = rails::build_adapter(adapter_config.clone(), infra.clone())
                .with_context(|| format!("building adapter {}", adapter_config.adapter_id))?;
            registry.register(&tenant_id, adapter).await;
            info!(
                tenant_id,
                adapter_id = %adapter_config.adapter_id,
                rail = %adapter_config.rail,
                "Registered clearing adapter"
            );
        }
    }

    let ledger = Arc::new(HttpLedgerClient::new(LedgerConfig {
        base_url: config.ledger_url.clone(),
        timeout_ms: adapters::DEFAULT_REQUEST_TIMEOUT_MS,
    })?);
    let fraud = Arc::new(HttpFraudClient::new(FraudConfig {
        base_url: config.fraud_url.clone(),
        timeout_ms: 5_000,
        threshold: config.fraud_threshold,
    })?);

    let resolver = Arc::new(RoutingResolver::new(Arc::new(CircuitProbe(breakers))));

    // Engine
    let deps = EngineDeps {
        payments: backing.payments,
        sagas: backing.sagas.clone(),
        clearing_results: backing.clearing,
        config: config_store,
        ledger,
        fraud,
        adapters: registry,
        resolver,
    };
    let engine = Arc::new(SagaEngine::new(deps, EngineConfig::default()));

    // Response delivery
    let response_dlq = Arc::new(DeadLetterQueue::new(1024));
    let dispatcher = Arc::new(ResponseDispatcher::new(
        bus.clone(),
        response_dlq.clone(),
        DispatcherConfig::default(),
    )?);

    let state = AppState {
        engine: engine.clone(),
        uetr_index: backing.uetr,
        dispatcher,
        response_dlq,
        bus: bus.clone(),
    };

    // Background workers
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(
        SagaRunner::new(engine, backing.sagas, RunnerConfig::default()).run(shutdown_rx.clone()),
    );
    tokio::spawn(
        OutboxPublisher::new(backing.outbox, bus, PublisherConfig::default())
            .run(shutdown_rx.clone()),
    );
    tokio::spawn(response_worker::run(state.clone(), shutdown_rx));

    // Serve
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Gateway listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    Ok(())
}
