//! Resolution logic

use crate::{
    AvailabilityProbe, Error, Result, RouteSource, RoutingDecision, RoutingRequest,
    ZAR_INSTANT_MAX,
};
use payment_core::Currency;
use rust_decimal::Decimal;
use std::sync::Arc;
use tenant_config::{Rail, TenantConfig};
use tracing::debug;

/// Routing resolver
pub struct RoutingResolver {
    probe: Arc<dyn AvailabilityProbe>,
}

impl RoutingResolver {
    /// Create a resolver over an availability probe
    pub fn new(probe: Arc<dyn AvailabilityProbe>) -> Self {
        Self { probe }
    }

    /// Resolve the ranked candidate list for a payment
    pub async fn resolve(
        &self,
        config: &TenantConfig,
        request: &RoutingRequest,
    ) -> Result<RoutingDecision> {
        let (candidates, source) = self
            .tenant_rule(config, request)
            .or_else(|| self.payment_type_default(config, request))
            .or_else(|| self.heuristic(config, request))
            .or_else(|| self.tenant_default(config))
            .ok_or_else(|| Error::NoRoute {
                tenant_id: request.tenant_id.clone(),
                payment_type: request.payment_type.clone(),
            })?;

        // Only adapters actually configured for the tenant survive
        let mut seen = Vec::new();
        let mut healthy = Vec::new();
        let mut degraded = Vec::new();
        for adapter_id in candidates {
            if seen.contains(&adapter_id) || !config.clearing_adapters.contains_key(&adapter_id) {
                continue;
            }
            seen.push(adapter_id.clone());
            if self.probe.is_degraded(&request.tenant_id, &adapter_id).await {
                degraded.push(adapter_id);
            } else {
                healthy.push(adapter_id);
            }
        }
        healthy.extend(degraded);

        if healthy.is_empty() {
            return Err(Error::NoRoute {
                tenant_id: request.tenant_id.clone(),
                payment_type: request.payment_type.clone(),
            });
        }

        debug!(
            tenant_id = %request.tenant_id,
            payment_type = %request.payment_type,
            ?source,
            candidates = ?healthy,
            "Routing resolved"
        );
        Ok(RoutingDecision {
            candidates: healthy,
            source,
        })
    }

    fn tenant_rule(
        &self,
        config: &TenantConfig,
        request: &RoutingRequest,
    ) -> Option<(Vec<String>, RouteSource)> {
        config
            .routing_rules
            .iter()
            .filter(|rule| {
                rule.matches(
                    &request.payment_type,
                    request.local_instrument.as_deref(),
                    request.amount.currency.as_str(),
                    request.amount.amount,
                )
            })
            .max_by_key(|rule| rule.specificity())
            .filter(|rule| !rule.adapters.is_empty())
            .map(|rule| (rule.adapters.clone(), RouteSource::TenantRule))
    }

    fn payment_type_default(
        &self,
        config: &TenantConfig,
        request: &RoutingRequest,
    ) -> Option<(Vec<String>, RouteSource)> {
        config
            .payment_types
            .get(&request.payment_type)
            .and_then(|pt| pt.default_adapter.clone())
            .map(|adapter| (vec![adapter], RouteSource::PaymentTypeDefault))
    }

    fn heuristic(
        &self,
        config: &TenantConfig,
        request: &RoutingRequest,
    ) -> Option<(Vec<String>, RouteSource)> {
        let rails: Vec<Rail> = if request.cross_border {
            vec![Rail::Swift]
        } else if request.amount.currency == Currency::ZAR {
            if request.amount.amount <= Decimal::from(ZAR_INSTANT_MAX) {
                vec![Rail::Rtc, Rail::PayShap, Rail::Bankserv]
            } else {
                vec![Rail::Samos]
            }
        } else {
            return None;
        };

        let mut candidates = Vec::new();
        for rail in rails {
            let mut of_rail: Vec<&str> = config
                .clearing_adapters
                .values()
                .filter(|a| a.rail == rail)
                .map(|a| a.adapter_id.as_str())
                .collect();
            of_rail.sort();
            candidates.extend(of_rail.into_iter().map(str::to_string));
        }

        if candidates.is_empty() {
            None
        } else {
            Some((candidates, RouteSource::Heuristic))
        }
    }

    fn tenant_default(&self, config: &TenantConfig) -> Option<(Vec<String>, RouteSource)> {
        config
            .default_adapter
            .clone()
            .map(|adapter| (vec![adapter], RouteSource::TenantDefault))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use payment_core::Money;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tenant_config::{
        AuthConfig, CircuitBreakerSettings, ClearingAdapterConfig, RateLimitSettings,
        RetryPolicy, RoutingRule, TenantStatus,
    };

    struct DegradedSet(Vec<&'static str>);

    #[async_trait]
    impl AvailabilityProbe for DegradedSet {
        async fn is_degraded(&self, _tenant_id: &str, adapter_id: &str) -> bool {
            self.0.contains(&adapter_id)
        }
    }

    fn adapter(id: &str, rail: Rail) -> ClearingAdapterConfig {
        ClearingAdapterConfig {
            adapter_id: id.to_string(),
            tenant_id: "T1".to_string(),
            rail,
            base_url: "https://gw.example".to_string(),
            endpoint_path: "/submit".to_string(),
            base_url_override: None,
            http_method: "POST".to_string(),
            request_headers: HashMap::new(),
            query_params: HashMap::new(),
            auth: AuthConfig::None,
            timeout_ms: 1000,
            retries: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limit: RateLimitSettings::default(),
            payload_mappings: Vec::new(),
        }
    }

    fn config() -> TenantConfig {
        let mut clearing_adapters = HashMap::new();
        for (id, rail) in [
            ("rtc-primary", Rail::Rtc),
            ("payshap-primary", Rail::PayShap),
            ("samos-primary", Rail::Samos),
            ("swift-primary", Rail::Swift),
            ("bankserv-primary", Rail::Bankserv),
        ] {
            clearing_adapters.insert(id.to_string(), adapter(id, rail));
        }
        TenantConfig {
            tenant_id: "T1".to_string(),
            status: TenantStatus::Active,
            payment_types: HashMap::new(),
            clearing_adapters,
            routing_rules: Vec::new(),
            fraud: Default::default(),
            blocked_counterparties: Vec::new(),
            feature_flags: HashMap::new(),
            callback: None,
            default_adapter: Some("bankserv-primary".to_string()),
        }
    }

    fn request(amount: Decimal, cross_border: bool) -> RoutingRequest {
        RoutingRequest {
            tenant_id: "T1".to_string(),
            payment_type: "RTP".to_string(),
            local_instrument: None,
            amount: Money::new(amount, Currency::ZAR).unwrap(),
            cross_border,
        }
    }

    fn resolver() -> RoutingResolver {
        RoutingResolver::new(Arc::new(crate::AlwaysAvailable))
    }

    #[tokio::test]
    async fn test_explicit_rule_wins_over_heuristic() {
        let mut config = config();
        config.routing_rules.push(RoutingRule {
            payment_type: Some("RTP".to_string()),
            adapters: vec!["samos-primary".to_string()],
            ..Default::default()
        });

        let decision = resolver().resolve(&config, &request(dec!(100), false)).await.unwrap();
        assert_eq!(decision.source, RouteSource::TenantRule);
        assert_eq!(decision.candidates, vec!["samos-primary"]);
    }

    #[tokio::test]
    async fn test_heuristic_small_zar_prefers_instant_rails() {
        let decision = resolver()
            .resolve(&config(), &request(dec!(1000000), false))
            .await
            .unwrap();
        assert_eq!(decision.source, RouteSource::Heuristic);
        assert_eq!(
            decision.candidates,
            vec!["rtc-primary", "payshap-primary", "bankserv-primary"]
        );
    }

    #[tokio::test]
    async fn test_heuristic_high_value_zar_goes_to_samos() {
        let decision = resolver()
            .resolve(&config(), &request(dec!(1000000.0001), false))
            .await
            .unwrap();
        assert_eq!(decision.candidates, vec!["samos-primary"]);
    }

    #[tokio::test]
    async fn test_cross_border_goes_to_swift() {
        let decision = resolver()
            .resolve(&config(), &request(dec!(500), true))
            .await
            .unwrap();
        assert_eq!(decision.candidates, vec!["swift-primary"]);
    }

    #[tokio::test]
    async fn test_degraded_candidates_sort_last() {
        let resolver = RoutingResolver::new(Arc::new(DegradedSet(vec!["rtc-primary"])));
        let decision = resolver
            .resolve(&config(), &request(dec!(100), false))
            .await
            .unwrap();
        assert_eq!(
            decision.candidates,
            vec!["payshap-primary", "bankserv-primary", "rtc-primary"]
        );
    }

    #[tokio::test]
    async fn test_unknown_adapter_in_rule_is_dropped() {
        let mut config = config();
        config.routing_rules.push(RoutingRule {
            payment_type: Some("RTP".to_string()),
            adapters: vec!["ghost".to_string(), "rtc-primary".to_string()],
            ..Default::default()
        });

        let decision = resolver().resolve(&config, &request(dec!(100), false)).await.unwrap();
        assert_eq!(decision.candidates, vec!["rtc-primary"]);
    }
}
