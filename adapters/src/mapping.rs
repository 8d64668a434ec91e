//! Payload mapping engine
//!
//! Applies a [`PayloadMapping`] to a JSON document: defaults, then field
//! mappings with transformations, then repeated groups, then validations.
//! Paths are dot-separated; numeric segments index arrays.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tenant_config::{
    ArrayHandlingConfig, FieldMapping, PayloadMapping, TransformationRule, ValidationRule,
};
use uuid::Uuid;

/// Read the value at a dot-separated path
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write a value at a dot-separated path, creating intermediate objects
/// (and extending arrays for numeric segments)
pub fn set_path(doc: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = doc;

    for (i, segment) in segments.iter().enumerate() {
        let last = i == segments.len() - 1;

        if let Ok(index) = segment.parse::<usize>() {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let items = current.as_array_mut().unwrap();
            while items.len() <= index {
                items.push(Value::Null);
            }
            if last {
                items[index] = value;
                return Ok(());
            }
            current = &mut items[index];
        } else {
            if !current.is_object() {
                *current = Value::Object(serde_json::Map::new());
            }
            let map = current.as_object_mut().unwrap();
            if last {
                map.insert(segment.to_string(), value);
                return Ok(());
            }
            current = map
                .entry(segment.to_string())
                .or_insert(Value::Object(serde_json::Map::new()));
        }
    }

    Err(Error::Mapping(format!("empty path: {:?}", path)))
}

fn apply_transform(rule: &TransformationRule, source: &Value, input: Option<&Value>) -> Result<Option<Value>> {
    Ok(match rule {
        TransformationRule::Uppercase => input.map(|v| match v {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other.clone(),
        }),
        TransformationRule::CurrencyFormat => match input {
            Some(v) => {
                let raw = match v {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    other => {
                        return Err(Error::Mapping(format!(
                            "currency_format expects a number, got {}",
                            other
                        )))
                    }
                };
                let mut amount = Decimal::from_str(&raw)
                    .map_err(|e| Error::Mapping(format!("currency_format: {}", e)))?;
                amount.rescale(2);
                Some(Value::String(amount.to_string()))
            }
            None => None,
        },
        TransformationRule::DateFormat { pattern } => match input {
            Some(Value::String(raw)) => {
                let parsed: DateTime<Utc> = raw
                    .parse()
                    .map_err(|e| Error::Mapping(format!("date_format: {}", e)))?;
                Some(Value::String(parsed.format(pattern).to_string()))
            }
            Some(other) => {
                return Err(Error::Mapping(format!(
                    "date_format expects a string, got {}",
                    other
                )))
            }
            None => None,
        },
        TransformationRule::UuidGenerate => Some(Value::String(Uuid::new_v4().to_string())),
        TransformationRule::Now => Some(Value::String(Utc::now().to_rfc3339())),
        TransformationRule::Conditional {
            when_path,
            equals,
            value,
        } => {
            if get_path(source, when_path) == Some(equals) {
                Some(value.clone())
            } else {
                None
            }
        }
    })
}

fn apply_field_mappings(
    mappings: &[FieldMapping],
    source: &Value,
    target: &mut Value,
) -> Result<()> {
    for field in mappings {
        let input = get_path(source, &field.source_path);
        let output = match &field.transform {
            Some(rule) => apply_transform(rule, source, input)?,
            None => input.cloned(),
        };
        if let Some(value) = output {
            set_path(target, &field.target_path, value)?;
        }
    }
    Ok(())
}

fn apply_arrays(arrays: &[ArrayHandlingConfig], source: &Value, target: &mut Value) -> Result<()> {
    for array in arrays {
        let items = match get_path(source, &array.source_path) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::Mapping(format!(
                    "{} is not an array: {}",
                    array.source_path, other
                )))
            }
            None => continue,
        };

        let mut mapped = Vec::with_capacity(items.len());
        for item in items {
            let mut element = Value::Object(serde_json::Map::new());
            apply_field_mappings(&array.element_mappings, item, &mut element)?;
            mapped.push(element);
        }
        set_path(target, &array.target_path, Value::Array(mapped))?;
    }
    Ok(())
}

fn validate(rules: &[ValidationRule], target: &Value) -> Result<()> {
    for rule in rules {
        match rule {
            ValidationRule::Required { path } => match get_path(target, path) {
                Some(Value::Null) | None => {
                    return Err(Error::Mapping(format!("required field missing: {}", path)))
                }
                _ => {}
            },
            ValidationRule::MaxLength { path, max } => {
                if let Some(Value::String(s)) = get_path(target, path) {
                    if s.len() > *max {
                        return Err(Error::Mapping(format!(
                            "{} exceeds max length {} ({} chars)",
                            path,
                            max,
                            s.len()
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Apply a payload mapping to a source document
pub fn apply(mapping: &PayloadMapping, source: &Value) -> Result<Value> {
    let mut target = Value::Object(serde_json::Map::new());

    for (path, value) in &mapping.default_values {
        set_path(&mut target, path, value.clone())?;
    }
    apply_field_mappings(&mapping.field_mappings, source, &mut target)?;
    apply_arrays(&mapping.arrays, source, &mut target)?;
    validate(&mapping.validation_rules, &target)?;

    Ok(target)
}
