//! SAMOS adapter (high-value RTGS)
//!
//! Rail-native JSON wire built from the tenant's request payload mapping
//! (with a built-in default when none is configured). Settlement is gross
//! and immediate: `submit` returns the final status and there is no recall.

use crate::{
    clearing::{Capabilities, ClearingAdapter, ClearingOutcome},
    framework::{RailClient, WireBody},
    mapping, Error, Result,
};
use async_trait::async_trait;
use iso20022::camt::CancelOutcome;
use payment_core::Payment;
use serde::Deserialize;
use serde_json::json;
use tenant_config::Rail;

#[derive(Debug, Deserialize)]
struct SamosResponse {
    result: String,
    #[serde(default)]
    reason_code: Option<String>,
}

/// SAMOS adapter
pub struct SamosAdapter {
    client: RailClient,
}

impl SamosAdapter {
    /// Wrap a rail client
    pub fn new(client: RailClient) -> Self {
        Self { client }
    }

    fn build_wire(&self, payment: &Payment) -> Result<serde_json::Value> {
        let canonical = super::canonical_document(payment);
        match self.client.request_mapping() {
            Some(m) => mapping::apply(m, &canonical),
            None => Ok(json!({
                "reference": payment.uetr.as_str(),
                "settlementAmount": payment.amount.amount.to_string(),
                "currency": payment.amount.currency.as_str(),
                "payerAccount": payment.debtor.account,
                "payeeAccount": payment.creditor.account,
                "priority": "HIGH",
            })),
        }
    }

    /// Interpret a rail response, first normalizing it through the
    /// response-direction payload mapping when one is configured
    fn interpret(
        response_mapping: Option<&tenant_config::PayloadMapping>,
        body: &str,
    ) -> Result<ClearingOutcome> {
        let mut value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| Error::Mapping(format!("samos response: {}", e)))?;
        if let Some(m) = response_mapping {
            value = mapping::apply(m, &value)?;
        }
        let response: SamosResponse = serde_json::from_value(value)
            .map_err(|e| Error::Mapping(format!("samos response: {}", e)))?;
        Ok(match response.result.as_str() {
            "SETTLED" => ClearingOutcome::Settled,
            "REJECTED" => ClearingOutcome::Rejected {
                reason_code: response.reason_code.unwrap_or_else(|| "NARR".to_string()),
            },
            other => ClearingOutcome::Rejected {
                reason_code: format!("UNKNOWN_{}", other),
            },
        })
    }
}

#[async_trait]
impl ClearingAdapter for SamosAdapter {
    fn adapter_id(&self) -> &str {
        &self.client.config().adapter_id
    }

    fn rail(&self) -> Rail {
        Rail::Samos
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_cancel: false,
            synchronous: true,
        }
    }

    async fn submit(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let wire = self.build_wire(payment)?;
        let response = self.client.call("submit", None, WireBody::Json(wire)).await?;
        Self::interpret(self.client.response_mapping(), &response.body)
    }

    async fn cancel(&self, _payment: &Payment) -> Result<CancelOutcome> {
        Err(Error::Config("SAMOS settlement is final; no recall".to_string()))
    }

    async fn poll(&self, payment: &Payment) -> Result<ClearingOutcome> {
        let response = self
            .client
            .call(
                "poll",
                Some(&format!("/status/{}", payment.uetr)),
                WireBody::Json(json!({})),
            )
            .await?;
        Self::interpret(self.client.response_mapping(), &response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tenant_config::{FieldMapping, MappingDirection, PayloadMapping};

    #[test]
    fn test_interpret_settled() {
        let outcome = SamosAdapter::interpret(None, r#"{"result":"SETTLED"}"#).unwrap();
        assert_eq!(outcome, ClearingOutcome::Settled);
    }

    #[test]
    fn test_interpret_rejection_carries_reason() {
        let outcome =
            SamosAdapter::interpret(None, r#"{"result":"REJECTED","reason_code":"AM04"}"#)
                .unwrap();
        assert_eq!(
            outcome,
            ClearingOutcome::Rejected {
                reason_code: "AM04".to_string()
            }
        );
    }

    #[test]
    fn test_response_mapping_normalizes_rail_fields() {
        // A bank gateway answering with its own field names
        let mut mapping = PayloadMapping::empty(MappingDirection::Response);
        mapping.field_mappings = vec![
            FieldMapping {
                source_path: "outcome".to_string(),
                target_path: "result".to_string(),
                transform: None,
            },
            FieldMapping {
                source_path: "rejectionCode".to_string(),
                target_path: "reason_code".to_string(),
                transform: None,
            },
        ];

        let outcome = SamosAdapter::interpret(
            Some(&mapping),
            r#"{"outcome":"REJECTED","rejectionCode":"AM04"}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            ClearingOutcome::Rejected {
                reason_code: "AM04".to_string()
            }
        );
    }

    #[test]
    fn test_garbage_body_is_mapping_error() {
        assert!(SamosAdapter::interpret(None, "not json").is_err());
    }
}
