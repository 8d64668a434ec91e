//! Rail client: the shared outbound pipeline
//!
//! Every rail call flows through the same fixed order: tracing span,
//! metrics, rate limit, circuit breaker, retry, timeout, transport. Rails
//! only build wire bodies and interpret responses.

use crate::{
    auth::{apply_auth, build_http_client, TokenCache},
    circuit_breaker::CircuitBreakerManager,
    context::{context_headers, ServiceType},
    metrics::{ADAPTER_REQUESTS_TOTAL, ADAPTER_REQUEST_DURATION},
    rate_limit::RateLimiterRegistry,
    Error, Result,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tenant_config::{ClearingAdapterConfig, MappingDirection, PayloadMapping};
use tracing::{info, instrument, warn};

/// Wire body for a rail call
#[derive(Debug, Clone)]
pub enum WireBody {
    /// JSON payload
    Json(serde_json::Value),
    /// ISO 20022 XML payload
    Xml(String),
}

/// Response from a rail call (2xx only; anything else is an [`Error`])
#[derive(Debug, Clone)]
pub struct RailResponse {
    /// HTTP status
    pub status: u16,
    /// Raw body
    pub body: String,
}

/// Shared infrastructure handed to every adapter at build time
#[derive(Clone)]
pub struct RailInfra {
    /// Circuit breakers, one per adapter id
    pub breakers: Arc<CircuitBreakerManager>,
    /// Per-tenant rate limiters, one registry per process
    pub limiters: Arc<RateLimiterRegistry>,
    /// OAuth2 token cache
    pub tokens: Arc<TokenCache>,
}

/// HTTP client for one configured rail adapter
pub struct RailClient {
    config: ClearingAdapterConfig,
    http: reqwest::Client,
    infra: RailInfra,
}

impl RailClient {
    /// Build a client from adapter config
    pub fn new(config: ClearingAdapterConfig, infra: RailInfra) -> Result<Self> {
        let http = build_http_client(&config.auth, config.timeout_ms)?;
        Ok(Self { config, http, infra })
    }

    /// Adapter config
    pub fn config(&self) -> &ClearingAdapterConfig {
        &self.config
    }

    /// Request-direction payload mapping, when configured
    pub fn request_mapping(&self) -> Option<&PayloadMapping> {
        self.config
            .payload_mappings
            .iter()
            .find(|m| m.direction == MappingDirection::Request)
    }

    /// Response-direction payload mapping, when configured
    pub fn response_mapping(&self) -> Option<&PayloadMapping> {
        self.config
            .payload_mappings
            .iter()
            .find(|m| m.direction == MappingDirection::Response)
    }

    /// Issue one rail call through the full pipeline.
    /// `path_suffix` extends the configured endpoint path (e.g. `/cancel`).
    #[instrument(skip(self, body), fields(adapter_id = %self.config.adapter_id, rail = %self.config.rail))]
    pub async fn call(
        &self,
        operation: &'static str,
        path_suffix: Option<&str>,
        body: WireBody,
    ) -> Result<RailResponse> {
        let adapter_id = &self.config.adapter_id;
        let tenant_id = &self.config.tenant_id;
        let rail = self.config.rail.as_str();

        let timer = ADAPTER_REQUEST_DURATION
            .with_label_values(&[adapter_id, rail, operation])
            .start_timer();

        // Rate limit before the breaker so saturation never counts as failure
        if !self
            .infra
            .limiters
            .check(adapter_id, tenant_id, &self.config.rate_limit)
            .await
        {
            timer.observe_duration();
            ADAPTER_REQUESTS_TOTAL
                .with_label_values(&[adapter_id, rail, operation, "rate_limited"])
                .inc();
            return Err(Error::RateLimited {
                adapter_id: adapter_id.clone(),
                tenant_id: tenant_id.clone(),
            });
        }

        if !self
            .infra
            .breakers
            .is_request_allowed(adapter_id, &self.config.circuit_breaker)
            .await
        {
            timer.observe_duration();
            ADAPTER_REQUESTS_TOTAL
                .with_label_values(&[adapter_id, rail, operation, "circuit_open"])
                .inc();
            return Err(Error::CircuitOpen {
                adapter_id: adapter_id.clone(),
            });
        }

        let result = self.call_with_retry(operation, path_suffix, &body).await;

        timer.observe_duration();
        match &result {
            Ok(_) => {
                self.infra.breakers.record_success(adapter_id).await;
                ADAPTER_REQUESTS_TOTAL
                    .with_label_values(&[adapter_id, rail, operation, "success"])
                    .inc();
            }
            Err(e) => {
                // Business rejections are the rail working correctly; only
                // transport-level failures feed the breaker
                if e.is_retryable() {
                    self.infra.breakers.record_failure(adapter_id).await;
                }
                ADAPTER_REQUESTS_TOTAL
                    .with_label_values(&[adapter_id, rail, operation, "failure"])
                    .inc();
            }
        }

        result
    }

    async fn call_with_retry(
        &self,
        operation: &'static str,
        path_suffix: Option<&str>,
        body: &WireBody,
    ) -> Result<RailResponse> {
        let max_attempts = self.config.retries.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.config.retries.initial_backoff_ms);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let start = Instant::now();
            match self.call_once(path_suffix, body).await {
                Ok(response) => {
                    if attempts > 1 {
                        info!(
                            "{} to {} succeeded after {} attempts",
                            operation, self.config.adapter_id, attempts
                        );
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempts < max_attempts => {
                    warn!(
                        "{} to {} failed (attempt {}, {:?} elapsed), retrying in {:?}: {}",
                        operation,
                        self.config.adapter_id,
                        attempts,
                        start.elapsed(),
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_millis(self.config.retries.max_backoff_ms));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once(&self, path_suffix: Option<&str>, body: &WireBody) -> Result<RailResponse> {
        let url = match path_suffix {
            Some(suffix) => format!("{}{}", self.config.submit_url(), suffix),
            None => self.config.submit_url(),
        };

        let method: reqwest::Method = self
            .config
            .http_method
            .parse()
            .map_err(|_| Error::Config(format!("bad http method {}", self.config.http_method)))?;

        let mut request = self.http.request(method, &url);

        for (name, value) in context_headers(&self.config.tenant_id, ServiceType::Clearing) {
            request = request.header(name, value);
        }
        for (name, value) in &self.config.request_headers {
            request = request.header(name, value);
        }
        if !self.config.query_params.is_empty() {
            request = request.query(&self.config.query_params);
        }
        request = apply_auth(request, &self.config.auth, &self.http, &self.infra.tokens).await?;

        request = match body {
            WireBody::Json(value) => request.json(value),
            WireBody::Xml(xml) => request
                .header("Content-Type", "application/xml")
                .body(xml.clone()),
        };

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
        let text = response.text().await.unwrap_or_default();

        if (200..300).contains(&status) {
            Ok(RailResponse { status, body: text })
        } else {
            Err(Error::BankApi {
                status_code: status,
                message: text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_config::{
        AuthConfig, CircuitBreakerSettings, RateLimitSettings, RetryPolicy, Rail,
    };
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn infra() -> RailInfra {
        RailInfra {
            breakers: Arc::new(CircuitBreakerManager::new(CircuitBreakerSettings::default())),
            limiters: Arc::new(RateLimiterRegistry::new()),
            tokens: Arc::new(TokenCache::new()),
        }
    }

    fn config(base_url: String) -> ClearingAdapterConfig {
        ClearingAdapterConfig {
            adapter_id: "rtc-primary".to_string(),
            tenant_id: "T1".to_string(),
            rail: Rail::Rtc,
            base_url,
            endpoint_path: "/clearing/submit".to_string(),
            base_url_override: None,
            http_method: "POST".to_string(),
            request_headers: Default::default(),
            query_params: Default::default(),
            auth: AuthConfig::None,
            timeout_ms: 2_000,
            retries: RetryPolicy {
                max_attempts: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
            },
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limit: RateLimitSettings::default(),
            payload_mappings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_context_headers_present_on_every_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clearing/submit"))
            .and(header("X-Tenant-ID", "T1"))
            .and(header("X-Service-Type", "clearing"))
            .and(header("X-Route-Context", "T1-clearing"))
            .and(header("X-Downstream-Route", "clearing-system"))
            .and(header("X-Bank-Route", "/clearing/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RailClient::new(config(server.uri()), infra()).unwrap();
        let response = client
            .call("submit", None, WireBody::Json(serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_5xx_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RailClient::new(config(server.uri()), infra()).unwrap();
        let response = client
            .call("submit", None, WireBody::Json(serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.body, "ok");
    }

    #[tokio::test]
    async fn test_4xx_is_terminal_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad account"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RailClient::new(config(server.uri()), infra()).unwrap();
        let err = client
            .call("submit", None, WireBody::Json(serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BankApi { status_code: 422, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits_without_calling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut cfg = config(server.uri());
        cfg.circuit_breaker.open_seconds = 3600;
        let infra = infra();
        infra.breakers.force_open("rtc-primary").await;

        let client = RailClient::new(cfg, infra).unwrap();
        let err = client
            .call("submit", None, WireBody::Json(serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
    }
}
