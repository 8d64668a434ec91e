//! # Response dispatcher
//!
//! Builds the pain.002 for a payment's current state and delivers it per
//! the payment type's configured response mode:
//!
//! - `Synchronous`: handed back to the still-open accept request
//! - `Asynchronous`: POSTed to the tenant's callback URL with retries;
//!   undeliverable responses go to the dead-letter queue
//! - `KafkaTopic`: published to the per-(tenant, payment type) response
//!   topic, explicit override winning over the derived name
//!
//! The mode is read from the config version the payment pinned at
//! acceptance, never from the latest config.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod dispatcher;
pub mod dlq;
pub mod error;
pub mod metrics;

pub use dispatcher::{
    build_pain002, DispatchResult, DispatcherConfig, ResponseDispatcher, ResponseEnvelope,
};
pub use dlq::{DeadLetter, DeadLetterQueue};
pub use error::{Error, Result};
