//! # PayRail Adapters
//!
//! Outbound connectivity layer:
//! - clearing adapter framework (headers, auth, circuit breaker, rate limit,
//!   retry, timeout, payload mapping) plus one module per rail
//! - ledger adapter (hold / release / post / reverse, idempotent on a
//!   client-supplied key)
//! - fraud adapter (scoring)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Adapter Registry                    │
//! └────────────┬────────────────────────────────────────┘
//!              │
//!     ┌────────┼──────────┬──────────┬──────────┐
//!     │        │          │          │          │
//! ┌───▼────┐ ┌─▼──────┐ ┌─▼────┐ ┌───▼────┐ ┌───▼───┐
//! │ SAMOS  │ │Bankserv│ │ RTC  │ │PayShap │ │ SWIFT │
//! └───┬────┘ └─┬──────┘ └─┬────┘ └───┬────┘ └───┬───┘
//!     │        │          │          │          │
//!     └────────┴──────┬───┴──────────┴──────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────┐
//! │  Rail client: headers → auth → rate limit →      │
//! │  circuit breaker → retry → timeout → transport   │
//! └──────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod auth;
pub mod circuit_breaker;
pub mod clearing;
pub mod context;
pub mod error;
pub mod fraud;
pub mod framework;
pub mod ledger;
pub mod mapping;
pub mod metrics;
pub mod rails;
pub mod rate_limit;

pub use clearing::{AdapterRegistry, Capabilities, ClearingAdapter, ClearingOutcome};
pub use context::ServiceType;
pub use error::{Error, Result};
pub use fraud::{FraudClient, FraudScore, HttpFraudClient};
pub use ledger::{HttpLedgerClient, LedgerClient};

/// Default per-call timeout when config omits one
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Fraud score at or above this is rejected unless the tenant overrides it
pub const DEFAULT_FRAUD_THRESHOLD: u32 = 80;
