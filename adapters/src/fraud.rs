//! Fraud adapter
//!
//! Scores a payment on the external fraud service. Whether scoring runs at
//! all is decided upstream by the tenant's fraud toggle config.

use crate::{
    context::{context_headers, ServiceType},
    Error, Result, DEFAULT_FRAUD_THRESHOLD,
};
use async_trait::async_trait;
use payment_core::Payment;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

/// Fraud assessment for one payment
#[derive(Debug, Clone, Deserialize)]
pub struct FraudScore {
    /// Score, 0 (clean) to 100
    pub score: u32,
    /// Factors the service reported
    #[serde(default)]
    pub factors: Vec<String>,
}

impl FraudScore {
    /// Whether the score breaches the rejection threshold
    pub fn is_rejected(&self, threshold: u32) -> bool {
        self.score >= threshold
    }
}

/// Fraud scoring capability
#[async_trait]
pub trait FraudClient: Send + Sync {
    /// Score a payment
    async fn score(&self, payment: &Payment) -> Result<FraudScore>;

    /// Rejection threshold for this deployment
    fn threshold(&self) -> u32 {
        DEFAULT_FRAUD_THRESHOLD
    }
}

/// Fraud adapter configuration
#[derive(Debug, Clone)]
pub struct FraudConfig {
    /// Base URL of the fraud service
    pub base_url: String,
    /// Per-call timeout
    pub timeout_ms: u64,
    /// Rejection threshold
    pub threshold: u32,
}

/// HTTP fraud client
pub struct HttpFraudClient {
    config: FraudConfig,
    http: reqwest::Client,
}

impl HttpFraudClient {
    /// Build a client
    pub fn new(config: FraudConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .use_rustls_tls()
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl FraudClient for HttpFraudClient {
    #[instrument(skip(self, payment), fields(payment_id = %payment.payment_id))]
    async fn score(&self, payment: &Payment) -> Result<FraudScore> {
        let url = format!("{}/fraud/score", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "paymentId": payment.payment_id.to_string(),
            "uetr": payment.uetr.as_str(),
            "amount": payment.amount.amount.to_string(),
            "currency": payment.amount.currency.as_str(),
            "debtorAccount": payment.debtor.account,
            "creditorAccount": payment.creditor.account,
            "paymentType": payment.payment_type.as_str(),
        });

        let mut request = self.http.post(&url).json(&body);
        for (name, value) in context_headers(&payment.tenant.tenant_id, ServiceType::Fraud) {
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
        if !(200..300).contains(&status) {
            return Err(Error::BankApi {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    fn threshold(&self) -> u32 {
        self.config.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let score = FraudScore {
            score: 80,
            factors: vec![],
        };
        assert!(score.is_rejected(80));
        assert!(!score.is_rejected(81));
    }
}
