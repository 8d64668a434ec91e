//! Per-tenant token-bucket rate limiting for adapters

use crate::metrics::RATE_LIMIT_REJECTIONS;
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tenant_config::RateLimitSettings;
use tokio::sync::RwLock;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiters per adapter, keyed inside by tenant
#[derive(Default)]
pub struct RateLimiterRegistry {
    limiters: RwLock<HashMap<String, Arc<KeyedLimiter>>>,
}

impl RateLimiterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn build(settings: &RateLimitSettings) -> Arc<KeyedLimiter> {
        let per_second = NonZeroU32::new(settings.requests_per_second.max(1))
            .unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(settings.burst.max(1)).unwrap_or(NonZeroU32::MIN);
        Arc::new(RateLimiter::keyed(
            Quota::per_second(per_second).allow_burst(burst),
        ))
    }

    /// Check whether a call for `(adapter, tenant)` fits the budget now
    pub async fn check(
        &self,
        adapter_id: &str,
        tenant_id: &str,
        settings: &RateLimitSettings,
    ) -> bool {
        let limiter = {
            let limiters = self.limiters.read().await;
            limiters.get(adapter_id).cloned()
        };
        let limiter = match limiter {
            Some(l) => l,
            None => {
                let mut limiters = self.limiters.write().await;
                limiters
                    .entry(adapter_id.to_string())
                    .or_insert_with(|| Self::build(settings))
                    .clone()
            }
        };

        let allowed = limiter.check_key(&tenant_id.to_string()).is_ok();
        if !allowed {
            RATE_LIMIT_REJECTIONS
                .with_label_values(&[adapter_id, tenant_id])
                .inc();
        }
        allowed
    }
}
