//! # Saga engine
//!
//! Durable state machine driving one payment from acceptance to a terminal
//! state through the canonical credit-transfer step sequence:
//!
//! validate → fraud_score → reserve_funds → route → submit_clearing →
//! await_clearing_result → post_ledger → notify
//!
//! Guarantees:
//! - at-least-once step execution; every step is idempotent on
//!   `(saga_id, step_name, attempt)`
//! - at-most-one concurrent worker per saga (lease CAS)
//! - compensation of previously-succeeded steps on terminal failure
//! - exponential backoff with full jitter on retryable outcomes
//! - dead-letter marker instead of silent abandonment when compensation
//!   exhausts its retries

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod backoff;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod plan;
pub mod runner;
pub mod step;
pub mod steps;

pub use engine::{AdvanceResult, EngineConfig, SagaEngine};
pub use error::{Error, Result};
pub use outcome::{CompensationOutcome, StepOutcome};
pub use plan::step_names;
pub use runner::{RunnerConfig, SagaRunner};
pub use step::{EngineDeps, SagaStep, StepContext};
