//! JSON helpers for on-disk state.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// Encoding failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Decoding failed.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// Output was not UTF-8.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes `value` as indented JSON with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Same as [`to_json_stable`], as bytes ready to write.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    to_json_stable(value).map(String::into_bytes)
}

/// Deserializes JSON from bytes, pretty-printed or minified.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match `T`.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Deserialize)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pickup_domain::{Cookie, CookieJar};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stable_output_is_indented_with_trailing_newline() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::new("refreshToken", "r1").with_domain("shop.example.com"));

        let json = to_json_stable(&jar).unwrap();
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\n  \"cookies\": {"));

        let back: CookieJar = from_json_bytes(json.as_bytes()).unwrap();
        assert_eq!(back, jar);
    }

    #[test]
    fn test_invalid_input_is_a_deserialize_error() {
        let result: Result<CookieJar, _> = from_json_bytes(b"{not json");
        assert!(matches!(result, Err(SerializationError::Deserialize(_))));
    }
}
