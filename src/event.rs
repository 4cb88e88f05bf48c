//! API event records shipped to the collector
//!
//! Records are plain owned values. Once the assembler has built an
//! [`Event`] nothing edits it in place; a masking policy consumes it and
//! returns a replacement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::body_codec::{EncodedBody, TransferEncoding};
use crate::headers::HeaderMultimap;

/// HTTP request side of an event
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RequestRecord {
    /// When the request entered the middleware
    pub time: DateTime<Utc>,

    /// Full URL including query string
    pub uri: String,

    /// HTTP method
    pub verb: String,

    pub headers: HeaderMultimap,

    /// Always present on the wire; `null` when no address could be resolved
    pub ip_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<RawValue>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_encoding: Option<TransferEncoding>,
}

/// HTTP response side of an event
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResponseRecord {
    /// When the downstream chain finished
    pub time: DateTime<Utc>,

    pub status: u16,

    pub headers: HeaderMultimap,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<RawValue>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_encoding: Option<TransferEncoding>,
}

/// Complete request/response event
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Event {
    pub request: RequestRecord,

    pub response: ResponseRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

impl RequestRecord {
    /// Encoded body with its transfer encoding, if a body was captured
    pub fn encoded_body(&self) -> Option<EncodedBody> {
        encoded(&self.body, self.transfer_encoding)
    }
}

impl ResponseRecord {
    pub fn encoded_body(&self) -> Option<EncodedBody> {
        encoded(&self.body, self.transfer_encoding)
    }
}

impl Event {
    /// An event can be sent only if it still identifies a request.
    pub fn is_valid(&self) -> bool {
        !self.request.uri.trim().is_empty() && !self.request.verb.trim().is_empty()
    }
}

fn encoded(
    body: &Option<Box<RawValue>>,
    transfer_encoding: Option<TransferEncoding>) -> Option<EncodedBody> {
    match (body, transfer_encoding) {
        (Some(body), Some(transfer_encoding)) => Some(EncodedBody {
            body: body.clone(),
            transfer_encoding,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(text: &str) -> Box<RawValue> {
        RawValue::from_string(text.to_string()).unwrap()
    }

    fn sample_event() -> Event {
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let mut headers = HeaderMultimap::new();
        headers.append("Accept", "application/json");

        Event {
            request: RequestRecord {
                time,
                uri: "http://localhost:8080/foo?x=1".to_string(),
                verb: "GET".to_string(),
                headers: headers.clone(),
                ip_address: Some("127.0.0.1".to_string()),
                api_version: None,
                body: None,
                transfer_encoding: None,
            },
            response: ResponseRecord {
                time,
                status: 200,
                headers,
                body: Some(raw(r#"{"a":1}"#)),
                transfer_encoding: Some(TransferEncoding::Json),
            },
            user_id: Some("user-1".to_string()),
            session_token: None,
            tags: None,
        }
    }

    #[test]
    fn test_event_serialization_shape() {
        let value = serde_json::to_value(sample_event()).unwrap();

        assert_eq!(value["request"]["verb"], "GET");
        assert_eq!(value["request"]["uri"], "http://localhost:8080/foo?x=1");
        assert_eq!(value["request"]["ip_address"], "127.0.0.1");
        assert_eq!(value["request"]["headers"]["accept"], json!(["application/json"]));
        assert_eq!(value["request"]["time"], "2024-01-15T10:30:00Z");
        assert_eq!(value["response"]["status"], 200);
        assert_eq!(value["response"]["body"], json!({"a": 1}));
        assert_eq!(value["response"]["transfer_encoding"], "json");
        assert_eq!(value["user_id"], "user-1");
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let value = serde_json::to_value(sample_event()).unwrap();
        let request = value["request"].as_object().unwrap();

        assert!(!request.contains_key("body"));
        assert!(!request.contains_key("transfer_encoding"));
        assert!(!request.contains_key("api_version"));
        assert!(request.contains_key("ip_address"));
        assert!(!value.as_object().unwrap().contains_key("session_token"));
        assert!(!value.as_object().unwrap().contains_key("tags"));
    }

    #[test]
    fn test_unresolved_ip_is_null_not_missing() {
        let mut event = sample_event();
        event.request.ip_address = None;

        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["request"]["ip_address"], serde_json::Value::Null);
        assert!(value["request"].as_object().unwrap().contains_key("ip_address"));
    }

    #[test]
    fn test_body_is_embedded_verbatim() {
        let mut event = sample_event();
        event.response.body = Some(raw(r#"{"id":123456789012345678901234567890,"id":2}"#));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""body":{"id":123456789012345678901234567890,"id":2}"#));
    }

    #[test]
    fn test_event_deserialization() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.request.verb, "GET");
        assert_eq!(event.response.status, 200);
        assert_eq!(event.request.time, sample_event().request.time);
    }

    #[test]
    fn test_validity() {
        let mut event = sample_event();
        assert!(event.is_valid());

        event.request.uri = String::new();
        assert!(!event.is_valid());
    }

    #[test]
    fn test_encoded_body_accessor() {
        let event = sample_event();
        assert!(event.request.encoded_body().is_none());
        let body = event.response.encoded_body().unwrap();
        assert_eq!(body.transfer_encoding, TransferEncoding::Json);
    }
}
