//! Saga advancement
//!
//! One advancement = acquire the lease, execute the next due step (or
//! compensation), persist the outcome with its outbox events, release the
//! lease. Workers race on the lease CAS; losers skip.

use crate::{
    backoff::full_jitter,
    metrics::{SAGA_STEP_DURATION, SAGA_STEP_TOTAL, SAGA_TERMINAL_TOTAL},
    plan::build_plan,
    step::{EngineDeps, StepContext},
    CompensationOutcome, Error, Result, SagaStep, StepOutcome,
};
use chrono::{Duration, Utc};
use event_bus::topics;
use payment_core::{
    CompensationStatus, Payment, PaymentStatus, ReasonCode, Saga, SagaId, SagaStatus, StepStatus,
    TenantContext,
};
use std::sync::Arc;
use store::OutboxEvent;
use tenant_config::TimeoutConfig;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Advancement lease length; must exceed p99 step duration
    pub lease_seconds: i64,
    /// Backoff base
    pub backoff_base_ms: u64,
    /// Backoff cap
    pub backoff_cap_ms: u64,
    /// Retry budget for rail-bound steps
    pub rail_step_max_attempts: u32,
    /// Retry budget for internal steps
    pub internal_step_max_attempts: u32,
    /// Retry budget for the await step (each attempt is a cheap poll)
    pub await_result_max_attempts: u32,
    /// Retry budget per compensation
    pub compensation_max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lease_seconds: 30,
            backoff_base_ms: 200,
            backoff_cap_ms: 30_000,
            rail_step_max_attempts: 3,
            internal_step_max_attempts: 5,
            await_result_max_attempts: 60,
            compensation_max_attempts: 5,
        }
    }
}

/// What one advancement did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceResult {
    /// A step or compensation executed
    Advanced,
    /// Nothing due yet (backoff pending)
    Waiting,
    /// Another worker holds the lease
    Busy,
    /// The saga is in a terminal status
    Terminal(SagaStatus),
}

/// Saga engine
pub struct SagaEngine {
    deps: EngineDeps,
    plan: Vec<Arc<dyn SagaStep>>,
    config: EngineConfig,
}

impl SagaEngine {
    /// Create an engine over its collaborators
    pub fn new(deps: EngineDeps, config: EngineConfig) -> Self {
        Self {
            deps,
            plan: build_plan(),
            config,
        }
    }

    /// Engine collaborators (shared with the gateway wiring)
    pub fn deps(&self) -> &EngineDeps {
        &self.deps
    }

    fn max_attempts(&self, step: &dyn SagaStep) -> u32 {
        if step.name() == "await_clearing_result" {
            self.config.await_result_max_attempts
        } else if step.rail_bound() {
            self.config.rail_step_max_attempts
        } else {
            self.config.internal_step_max_attempts
        }
    }

    /// Advance one saga by at most one step
    pub async fn advance(&self, saga_id: SagaId) -> Result<AdvanceResult> {
        let token = Uuid::new_v4();
        let lease = Duration::seconds(self.config.lease_seconds);

        let mut saga = match self.deps.sagas.try_acquire_lease(saga_id, token, lease).await? {
            Some(saga) => saga,
            None => {
                // Terminal sagas and live leases both land here
                return match self.deps.sagas.load(saga_id).await? {
                    Some(s) if s.status.is_terminal() => Ok(AdvanceResult::Terminal(s.status)),
                    Some(_) => Ok(AdvanceResult::Busy),
                    None => Err(Error::SagaNotFound(saga_id.to_string())),
                };
            }
        };

        let tenant = TenantContext::new(saga.tenant_id.clone());
        let mut payment = self
            .deps
            .payments
            .get(&tenant, saga.payment_id)
            .await?
            .ok_or_else(|| Error::PaymentMissing {
                saga_id: saga.saga_id.to_string(),
                payment_id: saga.payment_id.to_string(),
            })?;

        let snapshot = self
            .deps
            .config
            .at_version(&tenant.tenant_id, payment.config_version)
            .await?;

        let now = Utc::now();
        if saga.status == SagaStatus::Running {
            if saga.cancel_requested {
                info!(saga_id = %saga.saga_id, "Cancel honoured at step boundary");
                self.enter_compensation(&mut saga, ReasonCode::Cancelled);
            } else if now > saga.deadline {
                warn!(saga_id = %saga.saga_id, "Saga wall-clock deadline breached");
                self.enter_compensation(&mut saga, ReasonCode::Timeout);
            }
        }

        let timeouts = snapshot
            .config
            .payment_types
            .get(payment.payment_type.as_str())
            .map(|pt| pt.timeouts.clone())
            .unwrap_or_default();

        let mut events = Vec::new();
        let result = match saga.status {
            SagaStatus::Running => {
                self.advance_forward(&mut saga, &mut payment, &snapshot, &timeouts, &mut events)
                    .await
            }
            SagaStatus::Compensating => {
                self.advance_compensation(&mut saga, &mut payment, &snapshot, &timeouts, &mut events)
                    .await
            }
            terminal => AdvanceResult::Terminal(terminal),
        };

        // Commit the payment's status first, then the saga state with its
        // events; a pain.002 never reports a state that was not committed
        self.deps
            .payments
            .update_status(&tenant, payment.payment_id, payment.status, payment.failure_reason, vec![])
            .await?;

        saga.updated_at = Utc::now();
        self.deps.sagas.persist(&saga, token, events).await?;
        self.deps.sagas.release_lease(saga_id, token).await?;

        if let AdvanceResult::Terminal(status) = result {
            SAGA_TERMINAL_TOTAL
                .with_label_values(&[&format!("{:?}", status), &saga.tenant_id])
                .inc();
        }
        Ok(result)
    }

    async fn advance_forward(
        &self,
        saga: &mut Saga,
        payment: &mut Payment,
        snapshot: &Arc<tenant_config::VersionedTenantConfig>,
        timeouts: &TimeoutConfig,
        events: &mut Vec<OutboxEvent>,
    ) -> AdvanceResult {
        while saga.current_step_index < saga.steps.len()
            && matches!(
                saga.steps[saga.current_step_index].status,
                StepStatus::Succeeded | StepStatus::Skipped
            )
        {
            saga.current_step_index += 1;
        }

        if saga.current_step_index >= saga.steps.len() {
            return self.complete(saga, payment, events);
        }

        let index = saga.current_step_index;
        let step = self.plan[index].clone();
        let now = Utc::now();

        if let Some(at) = saga.steps[index].next_retry_at {
            if at > now {
                return AdvanceResult::Waiting;
            }
        }

        saga.steps[index].attempt += 1;
        saga.steps[index].status = StepStatus::Running;
        let attempt = saga.steps[index].attempt;

        let outcome = self
            .run_step(step.as_ref(), saga, payment, snapshot, timeouts, events, attempt)
            .await;

        let state = &mut saga.steps[index];
        match outcome {
            StepOutcome::Succeeded => {
                state.status = StepStatus::Succeeded;
                state.last_error = None;
                state.next_retry_at = None;
                saga.current_step_index += 1;
                AdvanceResult::Advanced
            }
            StepOutcome::Skipped(reason) => {
                info!(saga_id = %saga.saga_id, step = step.name(), reason, "Step skipped");
                state.status = StepStatus::Skipped;
                state.next_retry_at = None;
                saga.current_step_index += 1;
                AdvanceResult::Advanced
            }
            StepOutcome::Retryable(reason) => {
                state.last_error = Some(reason.clone());
                if attempt >= self.max_attempts(step.as_ref()) {
                    warn!(
                        saga_id = %saga.saga_id,
                        step = step.name(),
                        attempt,
                        "Retry budget exhausted; failing terminally: {}", reason
                    );
                    state.status = StepStatus::Failed;
                    self.enter_compensation(saga, ReasonCode::Timeout);
                    AdvanceResult::Advanced
                } else {
                    state.status = StepStatus::Pending;
                    state.next_retry_at = Some(
                        now + full_jitter(self.config.backoff_base_ms, self.config.backoff_cap_ms, attempt),
                    );
                    AdvanceResult::Waiting
                }
            }
            StepOutcome::Terminal(reason_code, detail) => {
                warn!(
                    saga_id = %saga.saga_id,
                    step = step.name(),
                    reason = %reason_code,
                    "Terminal step failure: {}", detail
                );
                state.status = StepStatus::Failed;
                state.last_error = Some(detail);
                self.enter_compensation(saga, reason_code);
                AdvanceResult::Advanced
            }
        }
    }

    async fn advance_compensation(
        &self,
        saga: &mut Saga,
        payment: &mut Payment,
        snapshot: &Arc<tenant_config::VersionedTenantConfig>,
        timeouts: &TimeoutConfig,
        events: &mut Vec<OutboxEvent>,
    ) -> AdvanceResult {
        let index = match saga
            .steps
            .iter()
            .rposition(|s| s.compensation_status == CompensationStatus::Pending)
        {
            Some(index) => index,
            None => return self.finish_compensation(saga, payment, events),
        };

        let step = self.plan[index].clone();
        let now = Utc::now();
        if let Some(at) = saga.steps[index].next_retry_at {
            if at > now {
                return AdvanceResult::Waiting;
            }
        }

        saga.steps[index].compensation_attempt += 1;
        saga.steps[index].status = StepStatus::Compensating;
        let attempt = saga.steps[index].compensation_attempt;

        let outcome = self
            .run_compensation(step.as_ref(), saga, payment, snapshot, timeouts, events, attempt)
            .await;

        let state = &mut saga.steps[index];
        match outcome {
            CompensationOutcome::Succeeded => {
                state.compensation_status = CompensationStatus::Succeeded;
                state.status = StepStatus::Compensated;
                state.next_retry_at = None;
                AdvanceResult::Advanced
            }
            CompensationOutcome::Uncancellable(reason) => {
                warn!(
                    saga_id = %saga.saga_id,
                    step = step.name(),
                    "Compensation uncancellable, continuing: {}", reason
                );
                state.compensation_status = CompensationStatus::Uncancellable;
                state.status = StepStatus::Compensated;
                state.last_error = Some(reason);
                state.next_retry_at = None;
                AdvanceResult::Advanced
            }
            CompensationOutcome::Retryable(reason) => {
                state.last_error = Some(reason.clone());
                if attempt >= self.config.compensation_max_attempts {
                    error!(
                        saga_id = %saga.saga_id,
                        step = step.name(),
                        "Compensation exhausted; dead-lettering saga: {}", reason
                    );
                    state.compensation_status = CompensationStatus::Exhausted;
                    saga.status = SagaStatus::Failed;
                    saga.dead_lettered = true;
                    self.finalize_payment(saga, payment);
                    self.push_terminal_events(saga, payment, events);
                    AdvanceResult::Terminal(SagaStatus::Failed)
                } else {
                    state.next_retry_at = Some(
                        now + full_jitter(self.config.backoff_base_ms, self.config.backoff_cap_ms, attempt),
                    );
                    AdvanceResult::Waiting
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_step(
        &self,
        step: &dyn SagaStep,
        saga: &mut Saga,
        payment: &mut Payment,
        snapshot: &Arc<tenant_config::VersionedTenantConfig>,
        timeouts: &TimeoutConfig,
        events: &mut Vec<OutboxEvent>,
        attempt: u32,
    ) -> StepOutcome {
        let timer = SAGA_STEP_DURATION
            .with_label_values(&[step.name()])
            .start_timer();

        let mut ctx = StepContext {
            payment,
            saga,
            attempt,
            config: snapshot.clone(),
            deps: &self.deps,
            pending_events: events,
        };

        let deadline = std::time::Duration::from_secs(timeouts.step_seconds.max(1));
        let outcome = match tokio::time::timeout(deadline, step.execute(&mut ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => StepOutcome::Retryable("step_timeout".to_string()),
        };

        timer.observe_duration();
        let label = match &outcome {
            StepOutcome::Succeeded => "succeeded",
            StepOutcome::Retryable(_) => "retryable",
            StepOutcome::Terminal(..) => "terminal",
            StepOutcome::Skipped(_) => "skipped",
        };
        SAGA_STEP_TOTAL.with_label_values(&[step.name(), label]).inc();
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_compensation(
        &self,
        step: &dyn SagaStep,
        saga: &mut Saga,
        payment: &mut Payment,
        snapshot: &Arc<tenant_config::VersionedTenantConfig>,
        timeouts: &TimeoutConfig,
        events: &mut Vec<OutboxEvent>,
        attempt: u32,
    ) -> CompensationOutcome {
        let mut ctx = StepContext {
            payment,
            saga,
            attempt,
            config: snapshot.clone(),
            deps: &self.deps,
            pending_events: events,
        };

        let deadline = std::time::Duration::from_secs(timeouts.step_seconds.max(1));
        let outcome = match tokio::time::timeout(deadline, step.compensate(&mut ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => CompensationOutcome::Retryable("compensation_timeout".to_string()),
        };

        let label = match &outcome {
            CompensationOutcome::Succeeded => "compensated",
            CompensationOutcome::Retryable(_) => "compensation_retryable",
            CompensationOutcome::Uncancellable(_) => "uncancellable",
        };
        SAGA_STEP_TOTAL.with_label_values(&[step.name(), label]).inc();
        outcome
    }

    fn enter_compensation(&self, saga: &mut Saga, reason: ReasonCode) {
        saga.status = SagaStatus::Compensating;
        saga.failure_reason = Some(reason);
        for state in &mut saga.steps {
            if state.status == StepStatus::Succeeded {
                state.compensation_status = CompensationStatus::Pending;
                state.next_retry_at = None;
            }
        }
    }

    fn complete(
        &self,
        saga: &mut Saga,
        payment: &mut Payment,
        events: &mut Vec<OutboxEvent>,
    ) -> AdvanceResult {
        saga.status = SagaStatus::Completed;
        info!(saga_id = %saga.saga_id, payment_id = %payment.payment_id, "Saga completed");

        events.push(OutboxEvent::new(
            topics::PAYMENT_COMPLETED,
            payment.payment_id.to_string(),
            payment.tenant.tenant_id.clone(),
            serde_json::json!({
                "paymentId": payment.payment_id.to_string(),
                "uetr": payment.uetr.as_str(),
                "status": format!("{}", payment.status),
            }),
        ));
        events.push(OutboxEvent::new(
            topics::SAGA_COMPLETED,
            saga.saga_id.to_string(),
            saga.tenant_id.clone(),
            serde_json::json!({
                "sagaId": saga.saga_id.to_string(),
                "paymentId": payment.payment_id.to_string(),
                "status": "Completed",
            }),
        ));
        AdvanceResult::Terminal(SagaStatus::Completed)
    }

    fn finish_compensation(
        &self,
        saga: &mut Saga,
        payment: &mut Payment,
        events: &mut Vec<OutboxEvent>,
    ) -> AdvanceResult {
        saga.status = SagaStatus::Compensated;
        self.finalize_payment(saga, payment);
        info!(
            saga_id = %saga.saga_id,
            payment_id = %payment.payment_id,
            reason = ?saga.failure_reason,
            "Saga compensated"
        );
        self.push_terminal_events(saga, payment, events);
        AdvanceResult::Terminal(SagaStatus::Compensated)
    }

    fn finalize_payment(&self, saga: &Saga, payment: &mut Payment) {
        let posted_then_reversed = saga
            .steps
            .iter()
            .any(|s| s.name == "post_ledger" && s.compensation_status == CompensationStatus::Succeeded);
        let reason = saga.failure_reason.unwrap_or(ReasonCode::SystemError);

        let result = if posted_then_reversed {
            payment.transition(PaymentStatus::Reversed).map(|()| {
                payment.failure_reason = Some(reason);
            })
        } else {
            payment.fail(reason)
        };
        if let Err(e) = result {
            warn!(
                payment_id = %payment.payment_id,
                "Could not finalize payment status: {}", e
            );
        }
    }

    fn push_terminal_events(
        &self,
        saga: &Saga,
        payment: &Payment,
        events: &mut Vec<OutboxEvent>,
    ) {
        events.push(OutboxEvent::new(
            topics::PAYMENT_FAILED,
            payment.payment_id.to_string(),
            payment.tenant.tenant_id.clone(),
            serde_json::json!({
                "paymentId": payment.payment_id.to_string(),
                "uetr": payment.uetr.as_str(),
                "status": format!("{}", payment.status),
                "reason": saga.failure_reason.map(|r| r.as_str()),
            }),
        ));
        events.push(OutboxEvent::new(
            topics::SAGA_COMPLETED,
            saga.saga_id.to_string(),
            saga.tenant_id.clone(),
            serde_json::json!({
                "sagaId": saga.saga_id.to_string(),
                "paymentId": payment.payment_id.to_string(),
                "status": format!("{:?}", saga.status),
                "deadLettered": saga.dead_lettered,
            }),
        ));
    }

    /// Drive one saga until terminal or the budget elapses. Used by the
    /// synchronous response mode; background progress continues via the
    /// runner either way.
    pub async fn run_to_completion(
        &self,
        saga_id: SagaId,
        budget: std::time::Duration,
    ) -> Result<AdvanceResult> {
        let started = std::time::Instant::now();
        loop {
            let result = self.advance(saga_id).await?;
            match result {
                AdvanceResult::Terminal(_) => return Ok(result),
                _ if started.elapsed() >= budget => return Ok(result),
                AdvanceResult::Advanced => continue,
                AdvanceResult::Waiting | AdvanceResult::Busy => {
                    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
                }
            }
        }
    }
}
