//! # Routing resolver
//!
//! Deterministic function from payment attributes to a ranked list of
//! clearing adapter candidates. Evaluated most-specific-first:
//!
//! 1. explicit tenant routing rule
//! 2. payment-type default adapter
//! 3. currency/amount heuristic
//! 4. tenant default adapter
//!
//! Degraded candidates (open circuit, saturated rate limit, failed health
//! probe) sort to the back so the saga can fail over without re-running
//! routing; business rejections never trigger failover.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod health;
pub mod resolver;
pub mod types;

pub use error::{Error, Result};
pub use health::{AlwaysAvailable, AvailabilityProbe};
pub use resolver::RoutingResolver;
pub use types::{RoutingDecision, RoutingRequest, RouteSource};

/// Instant-rail ceiling for ZAR retail payments (R1m)
pub const ZAR_INSTANT_MAX: i64 = 1_000_000;
