//! Phone number validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

#[allow(clippy::expect_used)]
static MOBILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^01[016789]-?\d{3,4}-?\d{4}$").expect("valid regex")
});

/// A validated mobile phone number, stored as digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses `010-1234-5678`, `01012345678` and similar forms.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPhoneNumber`] if the input is not a
    /// mobile number.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if !MOBILE_PATTERN.is_match(trimmed) {
            return Err(DomainError::InvalidPhoneNumber(input.to_string()));
        }
        Ok(Self(trimmed.chars().filter(char::is_ascii_digit).collect()))
    }

    /// Digits only, e.g. `01012345678`.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Hyphenated display form, e.g. `010-1234-5678`.
    #[must_use]
    pub fn formatted(&self) -> String {
        let (head, rest) = self.0.split_at(3);
        let (middle, tail) = rest.split_at(rest.len() - 4);
        format!("{head}-{middle}-{tail}")
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: String) -> DomainResult<Self> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_forms() {
        let hyphenated = PhoneNumber::parse("010-1234-5678").unwrap();
        let compact = PhoneNumber::parse("01012345678").unwrap();
        assert_eq!(hyphenated, compact);
        assert_eq!(compact.digits(), "01012345678");
        assert_eq!(compact.formatted(), "010-1234-5678");

        let old_style = PhoneNumber::parse("011-123-4567").unwrap();
        assert_eq!(old_style.formatted(), "011-123-4567");
    }

    #[test]
    fn test_rejects_malformed() {
        for input in ["", "02-123-4567", "010-12-5678", "010123456789", "abc-defg-hijk"] {
            assert_eq!(
                PhoneNumber::parse(input),
                Err(DomainError::InvalidPhoneNumber(input.to_string())),
                "{input}"
            );
        }
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<PhoneNumber>(r#""010-9876-5432""#).is_ok());
        assert!(serde_json::from_str::<PhoneNumber>(r#""12345""#).is_err());
    }
}
