//! # PayRail Payment Core
//!
//! Canonical domain model shared by every engine crate:
//! - `Payment` aggregate with tenant-scoped identity and status machine
//! - `Money` (fixed-point, 4 fractional digits) and ISO 4217 currencies
//! - `Uetr` end-to-end reference
//! - `Saga` / `StepState` aggregate records (flat rows, relations by id)
//! - reason-code enumeration surfaced in pain.002

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod ids;
pub mod money;
pub mod payment;
pub mod reason;
pub mod saga;
pub mod tenant;
pub mod uetr;

pub use error::{Error, Result};
pub use ids::{IdempotencyKey, PaymentId, SagaId};
pub use money::{Currency, Money};
pub use payment::{Party, Payment, PaymentStatus, PaymentTypeCode};
pub use reason::ReasonCode;
pub use saga::{CompensationStatus, Saga, SagaStatus, StepState, StepStatus};
pub use tenant::TenantContext;
pub use uetr::Uetr;

/// Fractional digits carried by every monetary amount
pub const MONEY_SCALE: u32 = 4;

/// Length of a UETR (UUID without hyphens)
pub const UETR_LEN: usize = 32;
