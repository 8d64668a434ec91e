//! # Event bus facade
//!
//! Publish/subscribe abstraction used by saga steps, the response dispatcher
//! and audit emission, plus the outbox publisher worker that drains
//! transactionally-written domain events to the broker.
//!
//! Publish is at-least-once; consumers dedupe on the envelope's
//! `(aggregate_id, sequence)`.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod bus;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod publisher;
pub mod topics;

pub use bus::{EventBus, InMemoryBus, NatsBus, ReceivedMessage};
pub use envelope::EventEnvelope;
pub use error::{Error, Result};
pub use publisher::{OutboxPublisher, PublisherConfig};
