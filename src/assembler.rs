//! Event assembly from captured traffic
//!
//! Optional values that a collaborator left empty are omitted, never sent
//! as empty strings or placeholders.

use chrono::{DateTime, Utc};

use crate::body_codec;
use crate::event::{Event, RequestRecord, ResponseRecord};
use crate::request_capture::CapturedRequest;
use crate::response_capture::CapturedResponse;

/// Build the request side of an event.
///
/// `uri` and `ip_address` come from the URL and IP collaborators; the body
/// goes through the codec.
pub fn build_request_record(
    captured: &CapturedRequest,
    uri: String,
    ip_address: Option<String>,
    time: DateTime<Utc>,
    api_version: Option<String>,
) -> RequestRecord {
    let encoded = body_codec::classify(captured.content_as_bytes(), captured.content_type());

    RequestRecord {
        time,
        uri,
        verb: captured.method().to_string(),
        headers: captured.headers().clone(),
        ip_address: non_empty(ip_address),
        api_version: non_empty(api_version),
        transfer_encoding: encoded.as_ref().map(|e| e.transfer_encoding),
        body: encoded.map(|e| e.body),
    }
}

/// Build the response side of an event
pub fn build_response_record(captured: &CapturedResponse, time: DateTime<Utc>) -> ResponseRecord {
    let encoded = body_codec::classify(captured.content_as_bytes(), captured.content_type());

    ResponseRecord {
        time,
        status: captured.status().as_u16(),
        headers: captured.headers(),
        transfer_encoding: encoded.as_ref().map(|e| e.transfer_encoding),
        body: encoded.map(|e| e.body),
    }
}

pub fn build_event(
    request: RequestRecord,
    response: ResponseRecord,
    user_id: Option<String>,
    session_token: Option<String>,
    tags: Option<String>,
) -> Event {
    Event {
        request,
        response,
        user_id: non_empty(user_id),
        session_token: non_empty(session_token),
        tags: non_empty(tags),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body_codec::TransferEncoding;
    use actix_web::dev::ServiceResponse;
    use actix_web::test::TestRequest;
    use actix_web::HttpResponse;

    async fn captured_request(body: &'static [u8]) -> CapturedRequest {
        let mut req = TestRequest::post()
            .uri("/orders")
            .insert_header(("content-type", "application/json"))
            .set_payload(body)
            .to_srv_request();
        CapturedRequest::capture(&mut req).await.unwrap()
    }

    async fn captured_response(res: HttpResponse) -> CapturedResponse {
        let res = ServiceResponse::new(TestRequest::default().to_http_request(), res);
        CapturedResponse::capture(res).await.unwrap()
    }

    #[actix_rt::test]
    async fn test_request_record_with_json_body() {
        let captured = captured_request(br#"{"qty":2}"#).await;
        let now = Utc::now();

        let record = build_request_record(
            &captured,
            "http://localhost:8080/orders".to_string(),
            Some("10.0.0.1".to_string()),
            now,
            Some("v2".to_string()),
        );

        assert_eq!(record.verb, "POST");
        assert_eq!(record.time, now);
        assert_eq!(record.api_version.as_deref(), Some("v2"));
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(record.body.as_ref().map(|b| b.get()), Some(r#"{"qty":2}"#));
        assert_eq!(record.transfer_encoding, Some(TransferEncoding::Json));
        assert_eq!(record.headers.get("content-type"), Some("application/json"));
    }

    #[actix_rt::test]
    async fn test_empty_body_and_empty_api_version_are_absent() {
        let captured = captured_request(b"").await;

        let record = build_request_record(
            &captured,
            "http://localhost:8080/orders".to_string(),
            None,
            Utc::now(),
            Some(String::new()),
        );

        assert!(record.body.is_none());
        assert!(record.transfer_encoding.is_none());
        assert!(record.api_version.is_none());
        assert!(record.ip_address.is_none());
    }

    #[actix_rt::test]
    async fn test_response_record_with_binary_body() {
        let captured = captured_response(HttpResponse::Ok().body(vec![0x00u8, 0xFF, 0x10])).await;
        let record = build_response_record(&captured, Utc::now());

        assert_eq!(record.status, 200);
        assert_eq!(record.transfer_encoding, Some(TransferEncoding::Base64));
        let decoded = body_codec::decode_base64(&record.encoded_body().unwrap()).unwrap();
        assert_eq!(decoded, [0x00, 0xFF, 0x10]);
    }

    #[actix_rt::test]
    async fn test_build_event_omits_empty_optionals() {
        let request = build_request_record(
            &captured_request(b"").await,
            "http://localhost:8080/orders".to_string(),
            None,
            Utc::now(),
            None,
        );
        let response = build_response_record(
            &captured_response(HttpResponse::NotFound().finish()).await,
            Utc::now(),
        );

        let event = build_event(
            request,
            response,
            Some("user-7".to_string()),
            Some(String::new()),
            None,
        );

        assert_eq!(event.user_id.as_deref(), Some("user-7"));
        assert!(event.session_token.is_none());
        assert!(event.tags.is_none());
        assert_eq!(event.response.status, 404);
        assert!(event.response.body.is_none());
    }
}
