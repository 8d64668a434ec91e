//! Tenant and payment-type configuration records

use crate::adapter_config::ClearingAdapterConfig;
use crate::routing_rules::RoutingRule;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tenant lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantStatus {
    /// Accepting payments
    Active,
    /// Temporarily suspended; acceptances rejected
    Suspended,
    /// Offboarded
    Closed,
}

/// How the pain.002 is returned for a payment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseMode {
    /// Returned in the body of the accept call
    Synchronous,
    /// POSTed to the tenant's callback URL
    Asynchronous,
    /// Published to the per-(tenant, payment type) response topic
    KafkaTopic,
}

/// Parameters for the KafkaTopic response mode.
///
/// The `ResponseMode` enum is authoritative for the mode itself; this block
/// only carries mode-specific parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KafkaResponseConfig {
    /// Explicit topic; wins over the derived per-payment-type name
    pub topic_override: Option<String>,
    /// Routing hint: systems expected to consume the response
    #[serde(default)]
    pub target_systems: Vec<String>,
    /// Routing hint: delivery priority
    pub priority: Option<String>,
}

/// Step/saga/request deadlines for a payment type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-step execution deadline
    pub step_seconds: u64,
    /// Wall-clock deadline for the whole saga
    pub saga_seconds: u64,
    /// Budget for a synchronous accept call to reach a conclusive state
    pub sync_response_budget_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            step_seconds: 30,
            saga_seconds: 600,
            sync_response_budget_ms: 5_000,
        }
    }
}

/// Per-payment-type configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTypeConfig {
    /// Payment type code (e.g. `RTP`)
    pub code: String,

    /// Legacy flag kept for older tenants; `response_mode` is authoritative
    #[serde(default)]
    pub is_synchronous: bool,

    /// Response mode for pain.002 delivery
    pub response_mode: ResponseMode,

    /// KafkaTopic mode parameters
    pub kafka_response: Option<KafkaResponseConfig>,

    /// Maximum accepted amount (inclusive)
    pub max_amount: Option<Decimal>,

    /// Processing fee charged by the tenant
    pub processing_fee: Option<Decimal>,

    /// Deadlines
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Default clearing adapter when no routing rule matches
    pub default_adapter: Option<String>,
}

/// Fraud toggle for one scope; more specific rules win
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FraudToggleRule {
    /// Payment type scope
    pub payment_type: Option<String>,
    /// Local instrument scope
    pub local_instrument: Option<String>,
    /// Clearing system scope
    pub clearing_system: Option<String>,
    /// Whether fraud scoring runs for this scope
    pub enabled: bool,
}

impl FraudToggleRule {
    fn specificity(&self) -> usize {
        [
            self.payment_type.is_some(),
            self.local_instrument.is_some(),
            self.clearing_system.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }

    fn matches(
        &self,
        payment_type: &str,
        local_instrument: Option<&str>,
        clearing_system: Option<&str>,
    ) -> bool {
        let type_ok = self
            .payment_type
            .as_deref()
            .map(|t| t == payment_type)
            .unwrap_or(true);
        let instrument_ok = match (self.local_instrument.as_deref(), local_instrument) {
            (None, _) => true,
            (Some(want), Some(got)) => want == got,
            (Some(_), None) => false,
        };
        let clearing_ok = match (self.clearing_system.as_deref(), clearing_system) {
            (None, _) => true,
            (Some(want), Some(got)) => want == got,
            (Some(_), None) => false,
        };
        type_ok && instrument_ok && clearing_ok
    }
}

/// Fraud toggle configuration for a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudToggleConfig {
    /// Applied when no rule matches
    pub default_enabled: bool,
    /// Scoped overrides
    #[serde(default)]
    pub rules: Vec<FraudToggleRule>,
}

impl Default for FraudToggleConfig {
    fn default() -> Self {
        Self {
            default_enabled: true,
            rules: Vec::new(),
        }
    }
}

impl FraudToggleConfig {
    /// Resolve whether fraud scoring is enabled for the given scope.
    /// Most-specific matching rule wins; ties resolve to the first listed.
    pub fn resolve(
        &self,
        payment_type: &str,
        local_instrument: Option<&str>,
        clearing_system: Option<&str>,
    ) -> bool {
        self.rules
            .iter()
            .filter(|r| r.matches(payment_type, local_instrument, clearing_system))
            .max_by_key(|r| r.specificity())
            .map(|r| r.enabled)
            .unwrap_or(self.default_enabled)
    }
}

/// Asynchronous response delivery target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// Callback URL for pain.002 POSTs
    pub url: String,
    /// Bearer token presented on the callback, when configured
    pub bearer_token: Option<String>,
}

/// Tenant record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Tenant id
    pub tenant_id: String,

    /// Status
    pub status: TenantStatus,

    /// Payment type configs by code
    #[serde(default)]
    pub payment_types: HashMap<String, PaymentTypeConfig>,

    /// Clearing adapters by adapter id
    #[serde(default)]
    pub clearing_adapters: HashMap<String, ClearingAdapterConfig>,

    /// Routing rules, evaluated most-specific-first
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,

    /// Fraud scoring toggles
    #[serde(default)]
    pub fraud: FraudToggleConfig,

    /// Counterparty accounts blocked by tenant policy
    #[serde(default)]
    pub blocked_counterparties: Vec<String>,

    /// Feature flags
    #[serde(default)]
    pub feature_flags: HashMap<String, bool>,

    /// Callback delivery config for asynchronous responses
    pub callback: Option<CallbackConfig>,

    /// Last-resort clearing adapter
    pub default_adapter: Option<String>,
}

impl TenantConfig {
    /// Look up a payment type config
    pub fn payment_type(&self, code: &str) -> crate::Result<&PaymentTypeConfig> {
        self.payment_types
            .get(code)
            .ok_or_else(|| crate::Error::PaymentTypeNotFound {
                tenant_id: self.tenant_id.clone(),
                code: code.to_string(),
            })
    }

    /// Look up a clearing adapter config
    pub fn clearing_adapter(&self, adapter_id: &str) -> crate::Result<&ClearingAdapterConfig> {
        self.clearing_adapters
            .get(adapter_id)
            .ok_or_else(|| crate::Error::AdapterNotFound {
                tenant_id: self.tenant_id.clone(),
                adapter_id: adapter_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_toggle_most_specific_wins() {
        let config = FraudToggleConfig {
            default_enabled: true,
            rules: vec![
                FraudToggleRule {
                    payment_type: Some("RTP".to_string()),
                    enabled: true,
                    ..Default::default()
                },
                FraudToggleRule {
                    payment_type: Some("RTP".to_string()),
                    local_instrument: Some("PBPX".to_string()),
                    enabled: false,
                    ..Default::default()
                },
            ],
        };

        assert!(config.resolve("RTP", None, None));
        assert!(!config.resolve("RTP", Some("PBPX"), None));
        assert!(config.resolve("ACH_CREDIT", None, None));
    }

    #[test]
    fn test_fraud_toggle_default_applies() {
        let config = FraudToggleConfig {
            default_enabled: false,
            rules: vec![],
        };
        assert!(!config.resolve("RTP", None, None));
    }

    #[test]
    fn test_scoped_rule_requires_scope_present() {
        let config = FraudToggleConfig {
            default_enabled: true,
            rules: vec![FraudToggleRule {
                clearing_system: Some("samos".to_string()),
                enabled: false,
                ..Default::default()
            }],
        };
        // No clearing hint yet: scoped rule does not apply
        assert!(config.resolve("WIRE_TRANSFER", None, None));
        assert!(!config.resolve("WIRE_TRANSFER", None, Some("samos")));
    }
}
