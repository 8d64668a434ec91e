//! Unique End-to-end Transaction Reference
//!
//! 32 lowercase hex characters (a UUID with the hyphens stripped), preserved
//! across every hop and every rail wire format.

use crate::{Error, Result, UETR_LEN};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UETR value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uetr(String);

impl Uetr {
    /// Generate a fresh UETR
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse and validate a UETR string
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "").to_lowercase();
        if normalized.len() != UETR_LEN {
            return Err(Error::InvalidUetr(format!(
                "expected {} chars, got {}",
                UETR_LEN,
                normalized.len()
            )));
        }
        if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidUetr("non-hex character".to_string()));
        }
        Ok(Self(normalized))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uetr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uetr_is_valid() {
        let uetr = Uetr::generate();
        assert_eq!(uetr.as_str().len(), UETR_LEN);
        assert!(Uetr::parse(uetr.as_str()).is_ok());
    }

    #[test]
    fn test_parse_accepts_hyphenated_uuid() {
        let raw = Uuid::new_v4();
        let uetr = Uetr::parse(&raw.to_string()).unwrap();
        assert_eq!(uetr.as_str(), raw.simple().to_string());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Uetr::parse("short").is_err());
        assert!(Uetr::parse(&"z".repeat(UETR_LEN)).is_err());
    }
}
