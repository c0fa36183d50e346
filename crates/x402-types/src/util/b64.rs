//! Base64 encoding and decoding utilities.
//!
//! Every x402 header value (`Payment-Required`, `Payment-Signature`, `X-PAYMENT`,
//! `Payment-Response`) is base64-encoded JSON, and Solana transactions travel as
//! base64-encoded wire bytes. [`Base64Bytes`] covers both.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::fmt::Display;

/// Bytes holding base64 text, borrowed or owned.
///
/// ```rust
/// use x402_types::util::Base64Bytes;
///
/// let encoded = Base64Bytes::encode(b"hello world");
/// assert_eq!(encoded.to_string(), "aGVsbG8gd29ybGQ=");
/// assert_eq!(encoded.decode().unwrap(), b"hello world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes<'a>(pub Cow<'a, [u8]>);

/// Failure to read a base64 JSON header value.
#[derive(Debug, thiserror::Error)]
pub enum Base64JsonError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Base64Bytes<'_> {
    /// Decodes the base64 text to raw binary data.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }

    /// Encodes raw binary data into base64 text.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Base64Bytes<'static> {
        let encoded = b64.encode(input.as_ref());
        Base64Bytes(Cow::Owned(encoded.into_bytes()))
    }

    /// Serializes `value` to JSON, then base64.
    pub fn encode_json<T: Serialize>(value: &T) -> Result<Base64Bytes<'static>, serde_json::Error> {
        let json = serde_json::to_vec(value)?;
        Ok(Self::encode(json))
    }

    /// Decodes base64, then parses the result as JSON.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, Base64JsonError> {
        let bytes = self.decode()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl AsRef<[u8]> for Base64Bytes<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<'a> From<&'a [u8]> for Base64Bytes<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Base64Bytes(Cow::Borrowed(slice))
    }
}

impl<'a> From<&'a str> for Base64Bytes<'a> {
    fn from(s: &'a str) -> Self {
        Base64Bytes(Cow::Borrowed(s.as_bytes()))
    }
}

impl Display for Base64Bytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_header_value() {
        let value = json!({"success": true, "transaction": "0xabc"});
        let encoded = Base64Bytes::encode_json(&value).unwrap().to_string();
        let decoded: serde_json::Value = Base64Bytes::from(encoded.as_str()).decode_json().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_decode_json_rejects_garbage() {
        let err = Base64Bytes::from("%%%").decode_json::<serde_json::Value>();
        assert!(matches!(err, Err(Base64JsonError::Base64(_))));
        let not_json = Base64Bytes::encode(b"not json").to_string();
        let err = Base64Bytes::from(not_json.as_str()).decode_json::<serde_json::Value>();
        assert!(matches!(err, Err(Base64JsonError::Json(_))));
    }
}
