//! Clearing adapter endpoint configuration

use crate::mapping::PayloadMapping;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Clearing rail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rail {
    /// SAMOS real-time gross settlement
    Samos,
    /// BankservAfrica ACH
    Bankserv,
    /// Real-time clearing
    Rtc,
    /// PayShap instant retail
    PayShap,
    /// SWIFT cross-border
    Swift,
}

impl Rail {
    /// Stable lowercase name used in URLs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Rail::Samos => "samos",
            Rail::Bankserv => "bankserv",
            Rail::Rtc => "rtc",
            Rail::PayShap => "payshap",
            Rail::Swift => "swift",
        }
    }

    /// Parse a rail name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "samos" => Some(Rail::Samos),
            "bankserv" => Some(Rail::Bankserv),
            "rtc" => Some(Rail::Rtc),
            "payshap" => Some(Rail::PayShap),
            "swift" => Some(Rail::Swift),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outbound authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No credentials
    None,
    /// Static API key header
    ApiKey {
        /// Header name
        header: String,
        /// Key value
        key: String,
    },
    /// Static bearer token
    Bearer {
        /// Token value
        token: String,
    },
    /// OAuth2 client-credentials grant
    OAuth2 {
        /// Token endpoint
        token_url: String,
        /// Client id
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Requested scope
        scope: Option<String>,
    },
    /// Mutual TLS client identity
    Mtls {
        /// PEM bundle path (certificate + key)
        identity_pem_path: String,
    },
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::None
    }
}

/// Retry policy for outbound calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts including the first call
    pub max_attempts: u32,
    /// Initial backoff
    pub initial_backoff_ms: u64,
    /// Backoff cap
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
        }
    }
}

/// Circuit breaker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Failure rate (0.0 - 1.0) over the window that opens the circuit
    pub failure_rate_threshold: f64,
    /// Minimum calls in the window before the rate is meaningful
    pub minimum_calls: u32,
    /// Sliding window length
    pub window_seconds: u64,
    /// How long the circuit stays open before half-open probing
    pub open_seconds: u64,
    /// Successes in half-open required to close
    pub half_open_successes: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            minimum_calls: 10,
            window_seconds: 60,
            open_seconds: 30,
            half_open_successes: 2,
        }
    }
}

/// Per-tenant rate limit for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 50,
            burst: 100,
        }
    }
}

/// Full configuration for one clearing adapter instance.
///
/// Several adapters may share the same external host:port (a bank NGINX);
/// the context headers injected by the adapter layer let the downstream
/// gateway demultiplex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearingAdapterConfig {
    /// Adapter id, unique per tenant
    pub adapter_id: String,

    /// Owning tenant
    pub tenant_id: String,

    /// Rail this adapter speaks to
    pub rail: Rail,

    /// Base URL of the downstream gateway
    pub base_url: String,

    /// Path appended to the base URL for submissions
    pub endpoint_path: String,

    /// Override for adapters not behind the shared gateway
    pub base_url_override: Option<String>,

    /// HTTP method for submissions
    #[serde(default = "default_method")]
    pub http_method: String,

    /// Static request headers
    #[serde(default)]
    pub request_headers: HashMap<String, String>,

    /// Static query parameters
    #[serde(default)]
    pub query_params: HashMap<String, String>,

    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-call timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Transport retry policy
    #[serde(default)]
    pub retries: RetryPolicy,

    /// Circuit breaker tuning
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,

    /// Rate limit per tenant
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Payload mappings, request and response direction
    #[serde(default)]
    pub payload_mappings: Vec<PayloadMapping>,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl ClearingAdapterConfig {
    /// Effective base URL (override wins)
    pub fn effective_base_url(&self) -> &str {
        self.base_url_override.as_deref().unwrap_or(&self.base_url)
    }

    /// Full submission URL
    pub fn submit_url(&self) -> String {
        format!(
            "{}/{}",
            self.effective_base_url().trim_end_matches('/'),
            self.endpoint_path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(rail: Rail) -> ClearingAdapterConfig {
        ClearingAdapterConfig {
            adapter_id: "rtc-primary".to_string(),
            tenant_id: "T1".to_string(),
            rail,
            base_url: "https://bank-gw.example".to_string(),
            endpoint_path: "/clearing/submit".to_string(),
            base_url_override: None,
            http_method: default_method(),
            request_headers: HashMap::new(),
            query_params: HashMap::new(),
            auth: AuthConfig::None,
            timeout_ms: default_timeout_ms(),
            retries: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limit: RateLimitSettings::default(),
            payload_mappings: Vec::new(),
        }
    }

    #[test]
    fn test_submit_url_joins_cleanly() {
        let config = minimal(Rail::Rtc);
        assert_eq!(config.submit_url(), "https://bank-gw.example/clearing/submit");
    }

    #[test]
    fn test_base_url_override_wins() {
        let mut config = minimal(Rail::Swift);
        config.base_url_override = Some("https://swift-direct.example/".to_string());
        assert_eq!(
            config.submit_url(),
            "https://swift-direct.example/clearing/submit"
        );
    }

    #[test]
    fn test_rail_names_round_trip() {
        for rail in [Rail::Samos, Rail::Bankserv, Rail::Rtc, Rail::PayShap, Rail::Swift] {
            assert_eq!(Rail::parse(rail.as_str()), Some(rail));
        }
        assert_eq!(Rail::parse("visa"), None);
    }
}
