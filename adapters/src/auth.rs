//! Outbound authentication
//!
//! Applies an [`AuthConfig`] to a request: static schemes attach headers
//! directly; OAuth2 fetches a client-credentials token and caches it until
//! shortly before expiry; mTLS is handled at client build time.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tenant_config::AuthConfig;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    300
}

/// OAuth2 token cache keyed by token endpoint + client id
#[derive(Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    async fn client_credentials_token(
        &self,
        http: &reqwest::Client,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        scope: Option<&str>,
    ) -> Result<String> {
        let cache_key = format!("{}|{}", token_url, client_id);
        {
            let tokens = self.tokens.lock().await;
            if let Some(token) = tokens.get(&cache_key) {
                if token.expires_at > Utc::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!(token_url, client_id, "Fetching OAuth2 token");
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }

        let response = http.post(token_url).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(Error::BankApi {
                status_code: response.status().as_u16(),
                message: "token endpoint rejected client credentials".to_string(),
            });
        }
        let token: TokenResponse = response.json().await?;

        // Refresh 30s before expiry so in-flight calls never carry a stale token
        let expires_at =
            Utc::now() + Duration::seconds(token.expires_in.saturating_sub(30) as i64);
        let mut tokens = self.tokens.lock().await;
        tokens.insert(
            cache_key,
            CachedToken {
                access_token: token.access_token.clone(),
                expires_at,
            },
        );
        Ok(token.access_token)
    }
}

/// Apply authentication to a request
pub async fn apply_auth(
    request: RequestBuilder,
    auth: &AuthConfig,
    http: &reqwest::Client,
    cache: &Arc<TokenCache>,
) -> Result<RequestBuilder> {
    Ok(match auth {
        AuthConfig::None => request,
        AuthConfig::ApiKey { header, key } => request.header(header, key),
        AuthConfig::Bearer { token } => request.bearer_auth(token),
        AuthConfig::OAuth2 {
            token_url,
            client_id,
            client_secret,
            scope,
        } => {
            let token = cache
                .client_credentials_token(http, token_url, client_id, client_secret, scope.as_deref())
                .await?;
            request.bearer_auth(token)
        }
        // Client identity was attached when the HTTP client was built
        AuthConfig::Mtls { .. } => request,
    })
}

/// Build the HTTP client an adapter uses; mTLS identities load here
pub fn build_http_client(auth: &AuthConfig, timeout_ms: u64) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .use_rustls_tls();

    if let AuthConfig::Mtls { identity_pem_path } = auth {
        let pem = std::fs::read(identity_pem_path)
            .map_err(|e| Error::Config(format!("mTLS identity {}: {}", identity_pem_path, e)))?;
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| Error::Config(format!("mTLS identity parse: {}", e)))?;
        builder = builder.identity(identity);
    }

    builder.build().map_err(Error::Http)
}
