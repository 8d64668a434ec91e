//! Canonical credit-transfer steps

pub mod await_clearing;
pub mod fraud_score;
pub mod notify;
pub mod post_ledger;
pub mod reserve_funds;
pub mod route;
pub mod submit_clearing;
pub mod validate;

pub use await_clearing::AwaitClearingResult;
pub use fraud_score::FraudScore;
pub use notify::Notify;
pub use post_ledger::PostLedger;
pub use reserve_funds::ReserveFunds;
pub use route::Route;
pub use submit_clearing::SubmitToClearing;
pub use validate::Validate;
