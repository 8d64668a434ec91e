//! # Tenant & config store
//!
//! Read-mostly lookup of tenant records, payment-type configuration,
//! response-mode configuration, routing rules, clearing-adapter endpoint
//! configuration and payload mappings.
//!
//! Configuration is versioned: a payment pins the version it saw at
//! acceptance and its saga reads that snapshot end-to-end, so a mid-saga
//! config write never changes behaviour of in-flight work.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod adapter_config;
pub mod error;
pub mod mapping;
pub mod routing_rules;
pub mod store;
pub mod types;

pub use adapter_config::{
    AuthConfig, CircuitBreakerSettings, ClearingAdapterConfig, Rail, RateLimitSettings,
    RetryPolicy,
};
pub use error::{Error, Result};
pub use mapping::{
    ArrayHandlingConfig, FieldMapping, MappingDirection, PayloadMapping, TransformationRule,
    ValidationRule,
};
pub use routing_rules::RoutingRule;
pub use store::{ConfigStore, VersionedTenantConfig};
pub use types::{
    CallbackConfig, FraudToggleConfig, FraudToggleRule, KafkaResponseConfig, PaymentTypeConfig,
    ResponseMode, TenantConfig, TenantStatus, TimeoutConfig,
};
