//! Versioned in-process config store
//!
//! Holds every published version of each tenant's configuration. Reads are
//! lock-free-cheap (`Arc` clones); writers publish a new version and emit a
//! config-changed notification so other processes can drop their caches.

use crate::{Error, Result, TenantConfig, TenantStatus};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// A tenant config pinned to the version it was published at
#[derive(Debug, Clone)]
pub struct VersionedTenantConfig {
    /// Version, monotonically increasing per tenant
    pub version: u64,
    /// The config
    pub config: TenantConfig,
}

/// Config store
#[derive(Default)]
pub struct ConfigStore {
    /// All published versions per tenant, oldest first
    tenants: RwLock<HashMap<String, Vec<Arc<VersionedTenantConfig>>>>,
}

/// Seed file shape: a list of tenant configs
#[derive(Debug, Deserialize)]
struct SeedFile {
    tenants: Vec<TenantConfig>,
}

impl ConfigStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load initial tenant configs from a TOML file
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let seed: SeedFile =
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;

        let count = seed.tenants.len();
        for tenant in seed.tenants {
            self.publish(tenant).await;
        }
        info!(tenants = count, "Loaded tenant configuration");
        Ok(count)
    }

    /// Publish a new config version for a tenant; returns the version
    pub async fn publish(&self, config: TenantConfig) -> u64 {
        let mut tenants = self.tenants.write().await;
        let versions = tenants.entry(config.tenant_id.clone()).or_default();
        let version = versions.last().map(|v| v.version + 1).unwrap_or(1);
        versions.push(Arc::new(VersionedTenantConfig { version, config }));
        version
    }

    /// All known tenant ids
    pub async fn tenant_ids(&self) -> Vec<String> {
        self.tenants.read().await.keys().cloned().collect()
    }

    /// Latest config for a tenant, regardless of status
    pub async fn latest(&self, tenant_id: &str) -> Result<Arc<VersionedTenantConfig>> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant_id)
            .and_then(|versions| versions.last().cloned())
            .ok_or_else(|| Error::TenantNotFound(tenant_id.to_string()))
    }

    /// Latest config, failing unless the tenant is ACTIVE. Used at acceptance.
    pub async fn resolve_active(&self, tenant_id: &str) -> Result<Arc<VersionedTenantConfig>> {
        let latest = self.latest(tenant_id).await?;
        if latest.config.status != TenantStatus::Active {
            return Err(Error::TenantInactive(tenant_id.to_string()));
        }
        Ok(latest)
    }

    /// Config at the exact version a payment pinned at acceptance
    pub async fn at_version(
        &self,
        tenant_id: &str,
        version: u64,
    ) -> Result<Arc<VersionedTenantConfig>> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant_id)
            .ok_or_else(|| Error::TenantNotFound(tenant_id.to_string()))?
            .iter()
            .find(|v| v.version == version)
            .cloned()
            .ok_or(Error::VersionNotFound {
                tenant_id: tenant_id.to_string(),
                version,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PaymentTypeConfig, ResponseMode, TimeoutConfig};

    fn tenant(tenant_id: &str, status: TenantStatus) -> TenantConfig {
        let mut payment_types = HashMap::new();
        payment_types.insert(
            "RTP".to_string(),
            PaymentTypeConfig {
                code: "RTP".to_string(),
                is_synchronous: true,
                response_mode: ResponseMode::Synchronous,
                kafka_response: None,
                max_amount: None,
                processing_fee: None,
                timeouts: TimeoutConfig::default(),
                default_adapter: None,
            },
        );
        TenantConfig {
            tenant_id: tenant_id.to_string(),
            status,
            payment_types,
            clearing_adapters: HashMap::new(),
            routing_rules: Vec::new(),
            fraud: Default::default(),
            blocked_counterparties: Vec::new(),
            feature_flags: HashMap::new(),
            callback: None,
            default_adapter: None,
        }
    }

    #[tokio::test]
    async fn test_versions_are_monotonic_and_snapshots_stable() {
        let store = ConfigStore::new();
        let v1 = store.publish(tenant("T1", TenantStatus::Active)).await;
        let v2 = store.publish(tenant("T1", TenantStatus::Suspended)).await;
        assert_eq!((v1, v2), (1, 2));

        // A payment pinned at v1 still sees the active record
        let pinned = store.at_version("T1", 1).await.unwrap();
        assert_eq!(pinned.config.status, TenantStatus::Active);

        let latest = store.latest("T1").await.unwrap();
        assert_eq!(latest.version, 2);
    }

    #[tokio::test]
    async fn test_resolve_active_rejects_suspended_tenant() {
        let store = ConfigStore::new();
        store.publish(tenant("T1", TenantStatus::Suspended)).await;

        match store.resolve_active("T1").await {
            Err(Error::TenantInactive(id)) => assert_eq!(id, "T1"),
            other => panic!("expected TenantInactive, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_unknown_tenant() {
        let store = ConfigStore::new();
        assert!(matches!(
            store.resolve_active("NOPE").await,
            Err(Error::TenantNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_seed_file() {
        let seed = r#"
[[tenants]]
tenant_id = "T1"
status = "Active"
default_adapter = "rtc-primary"

[tenants.payment_types.RTP]
code = "RTP"
is_synchronous = true
response_mode = "Synchronous"
max_amount = "1000000"

[tenants.fraud]
default_enabled = true

[[tenants.fraud.rules]]
payment_type = "RTP"
local_instrument = "PBPX"
enabled = false

[tenants.clearing_adapters.rtc-primary]
adapter_id = "rtc-primary"
tenant_id = "T1"
rail = "Rtc"
base_url = "https://bank-gw.example"
endpoint_path = "/clearing/submit"
http_method = "POST"
timeout_ms = 10000

[tenants.clearing_adapters.rtc-primary.auth]
scheme = "api_key"
header = "X-Api-Key"
key = "k"
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tenants.toml");
        std::fs::write(&path, seed).unwrap();

        let store = ConfigStore::new();
        assert_eq!(store.load_file(&path).await.unwrap(), 1);

        let snapshot = store.resolve_active("T1").await.unwrap();
        assert_eq!(snapshot.version, 1);
        let rtp = snapshot.config.payment_type("RTP").unwrap();
        assert_eq!(rtp.response_mode, ResponseMode::Synchronous);
        assert!(!snapshot.config.fraud.resolve("RTP", Some("PBPX"), None));
        let adapter = snapshot.config.clearing_adapter("rtc-primary").unwrap();
        assert_eq!(adapter.submit_url(), "https://bank-gw.example/clearing/submit");
    }
}
