//! Tenant routing rules

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One routing rule; unset fields match anything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Payment type scope
    pub payment_type: Option<String>,
    /// Local instrument scope
    pub local_instrument: Option<String>,
    /// Currency scope (ISO 4217)
    pub currency: Option<String>,
    /// Inclusive lower bound of the amount band
    pub min_amount: Option<Decimal>,
    /// Inclusive upper bound of the amount band
    pub max_amount: Option<Decimal>,
    /// Ranked adapter candidates when the rule matches
    pub adapters: Vec<String>,
}

impl RoutingRule {
    /// Number of constrained dimensions; higher is more specific
    pub fn specificity(&self) -> usize {
        [
            self.payment_type.is_some(),
            self.local_instrument.is_some(),
            self.currency.is_some(),
            self.min_amount.is_some() || self.max_amount.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }

    /// Whether the rule matches the given payment attributes
    pub fn matches(
        &self,
        payment_type: &str,
        local_instrument: Option<&str>,
        currency: &str,
        amount: Decimal,
    ) -> bool {
        if let Some(want) = self.payment_type.as_deref() {
            if want != payment_type {
                return false;
            }
        }
        match (self.local_instrument.as_deref(), local_instrument) {
            (Some(want), Some(got)) if want != got => return false,
            (Some(_), None) => return false,
            _ => {}
        }
        if let Some(want) = self.currency.as_deref() {
            if want != currency {
                return false;
            }
        }
        if let Some(min) = self.min_amount {
            if amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if amount > max {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_band_bounds_inclusive() {
        let rule = RoutingRule {
            currency: Some("ZAR".to_string()),
            min_amount: Some(dec!(0)),
            max_amount: Some(dec!(1000000)),
            adapters: vec!["rtc-primary".to_string()],
            ..Default::default()
        };

        assert!(rule.matches("RTP", None, "ZAR", dec!(1000000)));
        assert!(!rule.matches("RTP", None, "ZAR", dec!(1000000.0001)));
        assert!(!rule.matches("RTP", None, "USD", dec!(10)));
    }

    #[test]
    fn test_specificity_ordering() {
        let broad = RoutingRule::default();
        let narrow = RoutingRule {
            payment_type: Some("RTP".to_string()),
            local_instrument: Some("PBPX".to_string()),
            ..Default::default()
        };
        assert!(narrow.specificity() > broad.specificity());
    }
}
