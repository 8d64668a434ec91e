//! Ledger adapter
//!
//! Outbound capability to hold, release, post and reverse funds on the
//! external core banking system. Every call carries a caller-supplied
//! idempotency key; the ledger is contractually idempotent on it, which is
//! what makes saga replay after a lease reclaim safe.

use crate::{
    context::{context_headers, ServiceType},
    Error, Result,
};
use async_trait::async_trait;
use payment_core::Payment;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument};

/// Ledger operations used by the saga
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Place a hold on the debtor account for the payment amount
    async fn place_hold(&self, payment: &Payment, idempotency_key: &str) -> Result<()>;

    /// Release a previously placed hold
    async fn release_hold(&self, payment: &Payment, idempotency_key: &str) -> Result<()>;

    /// Finalize the debit/credit pair
    async fn post(&self, payment: &Payment, idempotency_key: &str) -> Result<()>;

    /// Write the reversing entry for a previously posted payment
    async fn reverse(&self, payment: &Payment, idempotency_key: &str) -> Result<()>;
}

/// Ledger adapter configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Base URL of the ledger gateway
    pub base_url: String,
    /// Per-call timeout
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct LedgerErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTP ledger client
pub struct HttpLedgerClient {
    config: LedgerConfig,
    http: reqwest::Client,
}

impl HttpLedgerClient {
    /// Build a client
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .use_rustls_tls()
            .build()?;
        Ok(Self { config, http })
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.payment_id))]
    async fn post_entry(
        &self,
        operation: &'static str,
        payment: &Payment,
        idempotency_key: &str,
    ) -> Result<()> {
        let url = format!("{}/ledger/{}", self.config.base_url.trim_end_matches('/'), operation);
        let body = json!({
            "paymentId": payment.payment_id.to_string(),
            "debtorAccount": payment.debtor.account,
            "creditorAccount": payment.creditor.account,
            "amount": payment.amount.amount.to_string(),
            "currency": payment.amount.currency.as_str(),
        });

        let mut request = self
            .http
            .post(&url)
            .header("X-Idempotency-Key", idempotency_key)
            .json(&body);
        for (name, value) in context_headers(&payment.tenant.tenant_id, ServiceType::Ledger) {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    millis: self.config.timeout_ms,
                    operation: url.clone(),
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            info!("Ledger {} recorded for payment {}", operation, payment.payment_id);
            return Ok(());
        }

        let error: LedgerErrorBody = response.json().await.unwrap_or(LedgerErrorBody {
            code: String::new(),
            message: String::new(),
        });

        match (status, error.code.as_str()) {
            (422, "INSUFFICIENT_FUNDS") | (409, "INSUFFICIENT_FUNDS") => {
                Err(Error::InsufficientFunds {
                    account: payment.debtor.account.clone(),
                })
            }
            (404, _) | (422, "UNKNOWN_ACCOUNT") => {
                Err(Error::InvalidAccount(payment.debtor.account.clone()))
            }
            _ => Err(Error::BankApi {
                status_code: status,
                message: error.message,
            }),
        }
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn place_hold(&self, payment: &Payment, idempotency_key: &str) -> Result<()> {
        self.post_entry("holds", payment, idempotency_key).await
    }

    async fn release_hold(&self, payment: &Payment, idempotency_key: &str) -> Result<()> {
        self.post_entry("holds/release", payment, idempotency_key).await
    }

    async fn post(&self, payment: &Payment, idempotency_key: &str) -> Result<()> {
        self.post_entry("postings", payment, idempotency_key).await
    }

    async fn reverse(&self, payment: &Payment, idempotency_key: &str) -> Result<()> {
        self.post_entry("postings/reverse", payment, idempotency_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::{
        Currency, IdempotencyKey, Money, Party, PaymentId, PaymentStatus, PaymentTypeCode,
        TenantContext, Uetr,
    };
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payment() -> Payment {
        Payment {
            payment_id: PaymentId::generate(),
            uetr: Uetr::generate(),
            tenant: TenantContext::new("T1"),
            amount: Money::new(dec!(100), Currency::ZAR).unwrap(),
            debtor: Party::new("ACC-A"),
            creditor: Party::new("ACC-B"),
            payment_type: PaymentTypeCode::new("RTP"),
            local_instrument: None,
            idempotency_key: IdempotencyKey::new("K1"),
            original_message_id: "MSG".to_string(),
            end_to_end_id: "E2E".to_string(),
            status: PaymentStatus::Validated,
            failure_reason: None,
            config_version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_hold_sends_ledger_context_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ledger/holds"))
            .and(header("X-Service-Type", "ledger"))
            .and(header("X-Route-Context", "T1-ledger"))
            .and(header("X-Idempotency-Key", "p1:reserve_funds"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpLedgerClient::new(LedgerConfig {
            base_url: server.uri(),
            timeout_ms: 2_000,
        })
        .unwrap();

        client
            .place_hold(&payment(), "p1:reserve_funds")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "code": "INSUFFICIENT_FUNDS",
                "message": "hold exceeds balance"
            })))
            .mount(&server)
            .await;

        let client = HttpLedgerClient::new(LedgerConfig {
            base_url: server.uri(),
            timeout_ms: 2_000,
        })
        .unwrap();

        let err = client.place_hold(&payment(), "k").await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert!(!err.is_retryable());
    }
}
