//! Saga aggregate records
//!
//! Flat row-per-step representation: a saga row plus ordered step rows,
//! relations by id only. The engine loads the minimum state it needs per
//! advancement.

use crate::{PaymentId, SagaId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Saga lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaStatus {
    /// Steps executing forward
    Running,
    /// All steps succeeded or skipped
    Completed,
    /// A terminal failure occurred; compensations walking backward
    Compensating,
    /// Every previously-succeeded step has a succeeded compensation
    Compensated,
    /// Compensation exhausted retries; dead-lettered for an operator
    Failed,
}

impl SagaStatus {
    /// Whether no further work will be scheduled
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaStatus::Completed | SagaStatus::Compensated | SagaStatus::Failed
        )
    }
}

/// Step execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    /// Not yet attempted
    Pending,
    /// Execute in flight (lease holder only)
    Running,
    /// Execute finished successfully
    Succeeded,
    /// Execute failed terminally
    Failed,
    /// Compensation in flight
    Compensating,
    /// Compensation recorded successful
    Compensated,
    /// Skipped by plan (e.g. fraud toggle off)
    Skipped,
}

/// Compensation status for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompensationStatus {
    /// No compensation attempted
    NotRequired,
    /// Compensation pending
    Pending,
    /// Compensation succeeded
    Succeeded,
    /// Compensation exhausted retries
    Exhausted,
    /// Rail does not support undo for this step
    Uncancellable,
}

/// One step row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepState {
    /// Step name (e.g. `reserve_funds`)
    pub name: String,

    /// Execution attempt counter (1-based once running)
    pub attempt: u32,

    /// Status
    pub status: StepStatus,

    /// Last error recorded, if any
    pub last_error: Option<String>,

    /// Earliest time the next retry may run
    pub next_retry_at: Option<DateTime<Utc>>,

    /// Compensation bookkeeping
    pub compensation_status: CompensationStatus,

    /// Compensation attempt counter
    pub compensation_attempt: u32,
}

impl StepState {
    /// Fresh pending step
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempt: 0,
            status: StepStatus::Pending,
            last_error: None,
            next_retry_at: None,
            compensation_status: CompensationStatus::NotRequired,
            compensation_attempt: 0,
        }
    }
}

/// Saga row, 1:1 with its payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Saga {
    /// Saga id
    pub saga_id: SagaId,

    /// Payment driven by this saga
    pub payment_id: PaymentId,

    /// Owning tenant (duplicated for row-level isolation)
    pub tenant_id: String,

    /// Index of the step currently being advanced
    pub current_step_index: usize,

    /// Ordered step rows
    pub steps: Vec<StepState>,

    /// Status
    pub status: SagaStatus,

    /// Worker holding the advancement lease
    pub lock_token: Option<Uuid>,

    /// Lease expiry; a live lease excludes other workers
    pub lease_deadline: Option<DateTime<Utc>>,

    /// Operator cancel honoured at the next step boundary
    pub cancel_requested: bool,

    /// Dead-letter marker set when compensation is exhausted
    pub dead_lettered: bool,

    /// Reason the saga entered compensation, if it did
    pub failure_reason: Option<crate::ReasonCode>,

    /// Saga wall-clock deadline
    pub deadline: DateTime<Utc>,

    /// Ranked clearing adapter candidates set by the routing step
    pub route_candidates: Vec<String>,

    /// Index of the candidate currently being tried
    pub route_position: usize,

    /// Adapter the payment was submitted through
    pub clearing_adapter_id: Option<String>,

    /// Rail-side tracking reference for async rails
    pub tracking_ref: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Saga {
    /// Fresh saga with every step pending
    pub fn new(
        saga_id: SagaId,
        payment_id: PaymentId,
        tenant_id: impl Into<String>,
        step_names: &[&str],
        deadline: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            saga_id,
            payment_id,
            tenant_id: tenant_id.into(),
            current_step_index: 0,
            steps: step_names.iter().map(|n| StepState::pending(*n)).collect(),
            status: SagaStatus::Running,
            lock_token: None,
            lease_deadline: None,
            cancel_requested: false,
            dead_lettered: false,
            failure_reason: None,
            deadline,
            route_candidates: Vec::new(),
            route_position: 0,
            clearing_adapter_id: None,
            tracking_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// All steps finished forward successfully (or skipped)
    pub fn all_steps_done(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Succeeded | StepStatus::Skipped))
    }

    /// Every previously-succeeded step has a succeeded (or not-required)
    /// compensation recorded
    pub fn fully_compensated(&self) -> bool {
        self.steps
            .iter()
            .filter(|s| {
                matches!(
                    s.status,
                    StepStatus::Succeeded | StepStatus::Compensating | StepStatus::Compensated
                )
            })
            .all(|s| {
                matches!(
                    s.compensation_status,
                    CompensationStatus::Succeeded
                        | CompensationStatus::NotRequired
                        | CompensationStatus::Uncancellable
                )
            })
    }

    /// Earliest time further work is scheduled, when the active step (or the
    /// active compensation) is waiting on a retry backoff
    pub fn next_wake_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            SagaStatus::Running => self
                .steps
                .get(self.current_step_index)
                .and_then(|s| s.next_retry_at),
            SagaStatus::Compensating => self
                .steps
                .iter()
                .rev()
                .find(|s| s.compensation_status == CompensationStatus::Pending)
                .and_then(|s| s.next_retry_at),
            _ => None,
        }
    }

    /// Whether the given worker token holds a live lease
    pub fn lease_held_by(&self, token: Uuid, now: DateTime<Utc>) -> bool {
        self.lock_token == Some(token)
            && self.lease_deadline.map(|d| d > now).unwrap_or(false)
    }

    /// Whether any worker may claim this saga now
    pub fn lease_available(&self, now: DateTime<Utc>) -> bool {
        match (self.lock_token, self.lease_deadline) {
            (None, _) => true,
            (Some(_), Some(deadline)) => deadline <= now,
            (Some(_), None) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_saga() -> Saga {
        Saga::new(
            SagaId::generate(),
            PaymentId::generate(),
            "T1",
            &["validate", "route"],
            Utc::now() + Duration::minutes(10),
        )
    }

    #[test]
    fn test_completed_requires_all_steps_done() {
        let mut saga = sample_saga();
        assert!(!saga.all_steps_done());
        saga.steps[0].status = StepStatus::Succeeded;
        saga.steps[1].status = StepStatus::Skipped;
        assert!(saga.all_steps_done());
    }

    #[test]
    fn test_lease_exactly_at_deadline_is_reclaimable() {
        let mut saga = sample_saga();
        let now = Utc::now();
        saga.lock_token = Some(Uuid::new_v4());
        saga.lease_deadline = Some(now);
        assert!(saga.lease_available(now));
        saga.lease_deadline = Some(now + Duration::seconds(1));
        assert!(!saga.lease_available(now));
    }

    #[test]
    fn test_compensated_invariant() {
        let mut saga = sample_saga();
        saga.steps[0].status = StepStatus::Compensated;
        saga.steps[0].compensation_status = CompensationStatus::Succeeded;
        saga.steps[1].status = StepStatus::Pending;
        assert!(saga.fully_compensated());

        saga.steps[0].compensation_status = CompensationStatus::Pending;
        assert!(!saga.fully_compensated());
    }
}
