//! Payload mapping configuration
//!
//! Data only: the transformation engine that applies these lives in the
//! adapter layer. Paths are dot-separated JSON pointers (`a.b.0.c`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which direction the mapping applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingDirection {
    /// Canonical payment -> rail wire
    Request,
    /// Rail wire -> canonical response
    Response,
}

/// Enumerated value transformations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TransformationRule {
    /// Uppercase a string value
    Uppercase,
    /// Format a decimal with exactly two fractional digits
    CurrencyFormat,
    /// Reformat an RFC 3339 timestamp with a strftime pattern
    DateFormat {
        /// strftime pattern
        pattern: String,
    },
    /// Generate a fresh UUID at apply time
    UuidGenerate,
    /// Insert the current timestamp (RFC 3339)
    Now,
    /// Set the target to `value` when `when_path` equals `equals`
    Conditional {
        /// Path probed in the source document
        when_path: String,
        /// Value compared against
        equals: serde_json::Value,
        /// Value written when the condition holds
        value: serde_json::Value,
    },
}

/// One source-to-target field mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Source path in the canonical document
    pub source_path: String,
    /// Target path in the wire document
    pub target_path: String,
    /// Optional transformation applied to the value
    pub transform: Option<TransformationRule>,
}

/// Validation applied to the mapped document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Path must exist and be non-null
    Required {
        /// Target path
        path: String,
    },
    /// String at path must not exceed the length
    MaxLength {
        /// Target path
        path: String,
        /// Maximum length
        max: usize,
    },
}

/// Array handling for repeated groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayHandlingConfig {
    /// Source array path
    pub source_path: String,
    /// Target array path
    pub target_path: String,
    /// Mappings applied per element, relative to the element root
    pub element_mappings: Vec<FieldMapping>,
}

/// Full payload mapping for one direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadMapping {
    /// Direction
    pub direction: MappingDirection,
    /// Scalar field mappings
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    /// Validations run after mapping
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    /// Defaults written to the target before mappings apply
    #[serde(default)]
    pub default_values: HashMap<String, serde_json::Value>,
    /// Repeated-group handling
    #[serde(default)]
    pub arrays: Vec<ArrayHandlingConfig>,
}

impl PayloadMapping {
    /// Empty mapping for a direction
    pub fn empty(direction: MappingDirection) -> Self {
        Self {
            direction,
            field_mappings: Vec::new(),
            validation_rules: Vec::new(),
            default_values: HashMap::new(),
            arrays: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_deserializes_from_json_config() {
        let raw = json!({
            "direction": "Request",
            "field_mappings": [
                {"source_path": "amount.value", "target_path": "amt", "transform": {"rule": "currency_format"}},
                {"source_path": "uetr", "target_path": "reference", "transform": null}
            ],
            "validation_rules": [
                {"kind": "required", "path": "reference"}
            ],
            "default_values": {"channel": "payrail"}
        });

        let mapping: PayloadMapping = serde_json::from_value(raw).unwrap();
        assert_eq!(mapping.direction, MappingDirection::Request);
        assert_eq!(mapping.field_mappings.len(), 2);
        assert_eq!(
            mapping.field_mappings[0].transform,
            Some(TransformationRule::CurrencyFormat)
        );
    }
}
