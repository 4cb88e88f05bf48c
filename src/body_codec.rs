//! Classification and transport-safe encoding of captured bodies
//!
//! Declared content types are unreliable, so every non-empty body is first
//! tried as JSON. Anything that does not parse is shipped as base64, which
//! means no byte sequence is ever unrepresentable and this module never fails.
//!
//! JSON bodies are kept as raw text once validated: large integers and
//! repeated keys reach the collector exactly as the client wrote them.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// How a captured body is represented in the event
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferEncoding {
    /// Body is the parsed JSON structure
    Json,
    /// Body is a base64 string of the raw bytes
    Base64,
}

/// A body ready to be placed in a record
#[derive(Debug, Clone)]
pub struct EncodedBody {
    pub body: Box<RawValue>,
    pub transfer_encoding: TransferEncoding,
}

impl EncodedBody {
    /// The body as JSON text, as it will appear in the event
    pub fn raw(&self) -> &str {
        self.body.get()
    }
}

/// Classify `bytes` and encode them for the collector.
///
/// Returns `None` for an empty body. `content_type_hint` is accepted for
/// callers that have one but does not decide the outcome.
pub fn classify(bytes: &[u8], content_type_hint: Option<&str>) -> Option<EncodedBody> {
    if bytes.is_empty() {
        return None;
    }

    match serde_json::from_slice::<Box<RawValue>>(bytes) {
        Ok(body) => Some(EncodedBody {
            body,
            transfer_encoding: TransferEncoding::Json,
        }),
        Err(err) => {
            tracing::trace!(
                content_type = content_type_hint.unwrap_or("<none>"),
                %err,
                len = bytes.len(),
                "body is not JSON, falling back to base64"
            );
            Some(EncodedBody {
                body: base64_string(bytes),
                transfer_encoding: TransferEncoding::Base64,
            })
        }
    }
}

fn base64_string(bytes: &[u8]) -> Box<RawValue> {
    // Serializing a plain string cannot fail.
    serde_json::value::to_raw_value(&base64::encode(bytes)).unwrap_or_default()
}

/// Recover the raw bytes of a base64-encoded body. Returns `None` for JSON bodies.
pub fn decode_base64(encoded: &EncodedBody) -> Option<Vec<u8>> {
    match encoded.transfer_encoding {
        TransferEncoding::Base64 => {
            let text: String = serde_json::from_str(encoded.raw()).ok()?;
            base64::decode(text).ok()
        }
        TransferEncoding::Json => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_absent() {
        assert!(classify(b"", Some("application/json")).is_none());
        assert!(classify(&[], None).is_none());
    }

    #[test]
    fn test_json_body_is_structured() {
        let encoded = classify(br#"{"a":1}"#, Some("application/json")).unwrap();
        assert_eq!(encoded.transfer_encoding, TransferEncoding::Json);
        assert_eq!(encoded.raw(), r#"{"a":1}"#);
    }

    #[test]
    fn test_json_detected_despite_wrong_content_type() {
        let encoded = classify(br#"[1, 2, 3]"#, Some("text/plain")).unwrap();
        assert_eq!(encoded.transfer_encoding, TransferEncoding::Json);
        assert_eq!(encoded.raw(), "[1, 2, 3]");
    }

    #[test]
    fn test_large_integers_keep_every_digit() {
        let encoded = classify(b"123456789012345678901234567890", None).unwrap();
        assert_eq!(encoded.transfer_encoding, TransferEncoding::Json);
        assert_eq!(encoded.raw(), "123456789012345678901234567890");

        assert_eq!(
            serde_json::to_string(&encoded.body).unwrap(),
            "123456789012345678901234567890"
        );
    }

    #[test]
    fn test_repeated_keys_are_not_collapsed() {
        let encoded = classify(br#"{"a":1,"a":2}"#, Some("application/json")).unwrap();
        assert_eq!(encoded.transfer_encoding, TransferEncoding::Json);
        assert_eq!(encoded.raw(), r#"{"a":1,"a":2}"#);
    }

    #[test]
    fn test_plain_text_falls_back_to_base64() {
        let encoded = classify(b"hello world", Some("application/json")).unwrap();
        assert_eq!(encoded.transfer_encoding, TransferEncoding::Base64);
        assert_eq!(encoded.raw(), r#""aGVsbG8gd29ybGQ=""#);
    }

    #[test]
    fn test_binary_bytes_round_trip_through_base64() {
        let raw = [0x00u8, 0xFF, 0x10];
        let encoded = classify(&raw, None).unwrap();
        assert_eq!(encoded.transfer_encoding, TransferEncoding::Base64);
        assert_eq!(decode_base64(&encoded).unwrap(), raw);
    }

    #[test]
    fn test_truncated_json_falls_back() {
        let raw = br#"{"a":"#;
        let encoded = classify(raw, Some("application/json")).unwrap();
        assert_eq!(encoded.transfer_encoding, TransferEncoding::Base64);
        assert_eq!(decode_base64(&encoded).unwrap(), raw.to_vec());
    }

    #[test]
    fn test_every_single_byte_is_representable() {
        for b in 0..=255u8 {
            let encoded = classify(&[b], None).unwrap();
            match encoded.transfer_encoding {
                TransferEncoding::Json => {
                    // Only ASCII digits form a complete JSON document on their own.
                    assert!(b.is_ascii_digit());
                }
                TransferEncoding::Base64 => assert_eq!(decode_base64(&encoded).unwrap(), [b]),
            }
        }
    }

    #[test]
    fn test_transfer_encoding_wire_names() {
        assert_eq!(serde_json::to_string(&TransferEncoding::Json).unwrap(), r#""json""#);
        assert_eq!(serde_json::to_string(&TransferEncoding::Base64).unwrap(), r#""base64""#);
    }
}
