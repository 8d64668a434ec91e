//! Dispatch logic

use crate::{
    dlq::{DeadLetter, DeadLetterQueue},
    metrics::RESPONSES_DISPATCHED_TOTAL,
    Error, Result,
};
use bytes::Bytes;
use chrono::Utc;
use event_bus::{topics, EventBus};
use iso20022::pain002::{self, GroupStatus, Pain002Document, StatusReportParams};
use payment_core::{Payment, PaymentStatus, ReasonCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tenant_config::{ResponseMode, VersionedTenantConfig};
use tracing::{info, warn};
use uuid::Uuid;

/// Map the payment's current state onto pain.002 statuses. Clearing
/// acceptance already reports `ACCP`: the rail has taken the payment and
/// only the ledger posting remains.
fn statuses_for(payment: &Payment) -> (GroupStatus, Option<ReasonCode>) {
    match payment.status {
        PaymentStatus::Settled | PaymentStatus::ClearingAccepted => (GroupStatus::ACCP, None),
        PaymentStatus::Failed | PaymentStatus::Reversed | PaymentStatus::ClearingRejected => (
            GroupStatus::RJCT,
            Some(payment.failure_reason.unwrap_or(ReasonCode::SystemError)),
        ),
        _ => (GroupStatus::PDNG, None),
    }
}

/// Build a pain.002 for the payment's current state
pub fn build_pain002(payment: &Payment) -> Pain002Document {
    let (status, reason) = statuses_for(payment);
    pain002::build(&StatusReportParams {
        message_id: format!("RSP-{}", Uuid::new_v4().simple()),
        original_message_id: payment.original_message_id.clone(),
        end_to_end_id: payment.end_to_end_id.clone(),
        uetr: payment.uetr.clone(),
        group_status: status,
        transaction_status: status,
        reason,
        created_at: Utc::now().to_rfc3339(),
    })
}

/// Envelope wrapped around a pain.002 published to a response topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// ISO message name
    pub message_type: String,
    /// Tenant
    pub tenant_id: String,
    /// Payment type
    pub payment_type: String,
    /// MsgId of the originating pain.001
    pub original_message_id: String,
    /// MsgId of this response
    pub response_message_id: String,
    /// When the response was produced
    pub timestamp: String,
    /// Response mode the tenant configured
    pub response_mode: String,
    /// Routing hint: consuming systems
    pub target_systems: Vec<String>,
    /// Routing hint: delivery priority
    pub priority: Option<String>,
    /// pain.002 XML
    pub payload: String,
}

/// How the response left the engine
#[derive(Debug)]
pub enum DispatchResult {
    /// Hand the document back on the open accept request
    Synchronous(Pain002Document),
    /// POSTed to the tenant callback
    Delivered,
    /// Published to a response topic
    Published {
        /// Topic the response landed on
        topic: String,
    },
}

/// Dispatcher tuning
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Callback delivery attempts
    pub callback_max_attempts: u32,
    /// Initial callback retry delay
    pub callback_initial_delay: Duration,
    /// Callback retry delay cap
    pub callback_max_delay: Duration,
    /// Callback request timeout
    pub callback_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            callback_max_attempts: 3,
            callback_initial_delay: Duration::from_millis(200),
            callback_max_delay: Duration::from_secs(5),
            callback_timeout: Duration::from_secs(10),
        }
    }
}

/// Response dispatcher
pub struct ResponseDispatcher {
    bus: Arc<dyn EventBus>,
    dlq: Arc<DeadLetterQueue>,
    http: reqwest::Client,
    config: DispatcherConfig,
}

impl ResponseDispatcher {
    /// Create a dispatcher
    pub fn new(
        bus: Arc<dyn EventBus>,
        dlq: Arc<DeadLetterQueue>,
        config: DispatcherConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.callback_timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::CallbackExhausted {
                url: String::new(),
                attempts: 0,
                last_error: e.to_string(),
            })?;
        Ok(Self {
            bus,
            dlq,
            http,
            config,
        })
    }

    /// Dispatch the pain.002 for a payment per its pinned config version
    pub async fn dispatch(
        &self,
        payment: &Payment,
        snapshot: &VersionedTenantConfig,
    ) -> Result<DispatchResult> {
        let payment_type = snapshot.config.payment_type(payment.payment_type.as_str())?;
        let mode = payment_type.response_mode;
        let document = build_pain002(payment);

        let result = match mode {
            ResponseMode::Synchronous => Ok(DispatchResult::Synchronous(document)),
            ResponseMode::Asynchronous => self.deliver_callback(payment, &document, snapshot).await,
            ResponseMode::KafkaTopic => self.publish_topic(payment, &document, snapshot).await,
        };

        let mode_label = match mode {
            ResponseMode::Synchronous => "synchronous",
            ResponseMode::Asynchronous => "asynchronous",
            ResponseMode::KafkaTopic => "kafka_topic",
        };
        RESPONSES_DISPATCHED_TOTAL
            .with_label_values(&[
                &payment.tenant.tenant_id,
                mode_label,
                if result.is_ok() { "success" } else { "failure" },
            ])
            .inc();
        result
    }

    async fn deliver_callback(
        &self,
        payment: &Payment,
        document: &Pain002Document,
        snapshot: &VersionedTenantConfig,
    ) -> Result<DispatchResult> {
        let callback = snapshot
            .config
            .callback
            .as_ref()
            .ok_or_else(|| Error::CallbackMissing(payment.tenant.tenant_id.clone()))?;
        let body = pain002::to_xml(document)?;

        let mut attempts = 0;
        let mut delay = self.config.callback_initial_delay;
        let last_error = loop {
            attempts += 1;
            let mut request = self
                .http
                .post(&callback.url)
                .header("Content-Type", "application/xml")
                .header("X-Tenant-ID", &payment.tenant.tenant_id)
                .body(body.clone());
            if let Some(token) = &callback.bearer_token {
                request = request.bearer_auth(token);
            }

            let error = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        payment_id = %payment.payment_id,
                        url = %callback.url,
                        "pain.002 delivered to callback"
                    );
                    return Ok(DispatchResult::Delivered);
                }
                Ok(response) => format!("HTTP {}", response.status().as_u16()),
                Err(e) => e.to_string(),
            };

            if attempts >= self.config.callback_max_attempts {
                break error;
            }
            warn!(
                payment_id = %payment.payment_id,
                attempts,
                "Callback delivery failed, retrying in {:?}: {}", delay, error
            );
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.config.callback_max_delay);
        };

        // Permanent failure: dead-letter and surface on the dead-letter topic
        let letter = DeadLetter {
            id: Uuid::new_v4(),
            tenant_id: payment.tenant.tenant_id.clone(),
            payment_id: payment.payment_id.to_string(),
            url: callback.url.clone(),
            body,
            last_error: last_error.clone(),
            attempts,
            created_at: Utc::now(),
        };
        self.bus
            .publish(
                topics::RESPONSE_DEAD_LETTER,
                Bytes::from(serde_json::to_vec(&letter)?),
            )
            .await?;
        self.dlq.push(letter).await;

        Err(Error::CallbackExhausted {
            url: callback.url.clone(),
            attempts,
            last_error,
        })
    }

    async fn publish_topic(
        &self,
        payment: &Payment,
        document: &Pain002Document,
        snapshot: &VersionedTenantConfig,
    ) -> Result<DispatchResult> {
        let payment_type = snapshot.config.payment_type(payment.payment_type.as_str())?;
        let kafka = payment_type.kafka_response.clone().unwrap_or_default();

        // Explicit override wins over the derived per-payment-type name
        let topic = kafka.topic_override.clone().unwrap_or_else(|| {
            topics::response_topic(&payment.tenant.tenant_id, &payment.payment_type)
        });

        let envelope = ResponseEnvelope {
            message_type: pain002::MESSAGE_TYPE.to_string(),
            tenant_id: payment.tenant.tenant_id.clone(),
            payment_type: payment.payment_type.as_str().to_string(),
            original_message_id: payment.original_message_id.clone(),
            response_message_id: document.report.group_header.message_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            response_mode: "KafkaTopic".to_string(),
            target_systems: kafka.target_systems,
            priority: kafka.priority,
            payload: pain002::to_xml(document)?,
        };

        self.bus
            .publish(&topic, Bytes::from(serde_json::to_vec(&envelope)?))
            .await?;
        info!(
            payment_id = %payment.payment_id,
            topic,
            "pain.002 published to response topic"
        );
        Ok(DispatchResult::Published { topic })
    }
}
