//! Gateway configuration
//!
//! Loaded from an optional TOML file (`--config <path>`) with environment
//! overrides. No other flags.

use serde::{Deserialize, Serialize};

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP bind address
    pub bind_addr: String,

    /// Postgres URL; in-memory stores are used when unset
    pub database_url: Option<String>,

    /// NATS URL; the in-process bus is used when unset
    pub nats_url: Option<String>,

    /// Tenant configuration seed file (TOML)
    pub tenants_file: Option<String>,

    /// Ledger gateway base URL
    pub ledger_url: String,

    /// Fraud service base URL
    pub fraud_url: String,

    /// Fraud rejection threshold
    pub fraud_threshold: u32,

    /// Max DB connections
    pub db_max_connections: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            nats_url: None,
            tenants_file: None,
            ledger_url: "http://localhost:9101".to_string(),
            fraud_url: "http://localhost:9102".to_string(),
            fraud_threshold: adapters::DEFAULT_FRAUD_THRESHOLD,
            db_max_connections: 50,
        }
    }
}

impl GatewayConfig {
    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var("PAYRAIL_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let Ok(url) = std::env::var("NATS_URL") {
            config.nats_url = Some(url);
        }
        if let Ok(path) = std::env::var("PAYRAIL_TENANTS_FILE") {
            config.tenants_file = Some(path);
        }
        if let Ok(url) = std::env::var("PAYRAIL_LEDGER_URL") {
            config.ledger_url = url;
        }
        if let Ok(url) = std::env::var("PAYRAIL_FRAUD_URL") {
            config.fraud_url = url;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_memory_backed() {
        let config = GatewayConfig::default();
        assert!(config.database_url.is_none());
        assert!(config.nats_url.is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}
