//! Request body capture for the ApiTrace middleware
//!
//! The inbound payload stream can be read only once. It is drained here
//! exactly once, kept as an immutable buffer, and every later reader gets a
//! replay of that buffer instead of touching the transport again.

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::error::PayloadError;
use actix_web::web::{Bytes, BytesMut};
use actix_web::{HttpMessage, HttpRequest};
use futures::stream;
use futures::StreamExt;

use crate::headers::HeaderMultimap;
use crate::utils::ClientIpResolver;

/// Buffered snapshot of an inbound request
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    method: String,
    headers: HeaderMultimap,
    body: Bytes,
    content_type: Option<String>,
}

impl CapturedRequest {
    /// Drain the request payload and put a replay back in its place.
    ///
    /// Headers are captured before the body. A transport read failure is
    /// returned untouched and the request is left with an empty payload,
    /// the same state an unwrapped failed read leaves behind.
    pub async fn capture(req: &mut ServiceRequest) -> Result<Self, PayloadError> {
        let method = req.method().to_string();
        let headers = HeaderMultimap::from(req.headers());
        let content_type = headers.get("content-type").map(str::to_string);

        let body = read_and_buffer_body(req).await?;

        let captured = Self {
            method,
            headers,
            body,
            content_type,
        };
        req.set_payload(captured.replay());
        Ok(captured)
    }

    /// A fresh payload stream yielding the captured bytes
    pub fn replay(&self) -> Payload {
        if self.body.is_empty() {
            return Payload::None;
        }
        let bytes = self.body.clone();
        Payload::Stream {
            payload: Box::pin(stream::once(async move { Ok::<_, PayloadError>(bytes) })),
        }
    }

    pub fn headers(&self) -> &HeaderMultimap {
        &self.headers
    }

    /// Originating client address, as resolved from the captured headers
    pub fn client_ip(&self, resolver: &dyn ClientIpResolver, req: &HttpRequest) -> Option<String> {
        resolver.client_ip(req, &self.headers)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_as_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, `None` when the body is empty
    pub fn content(&self) -> Option<String> {
        if self.body.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.body).into_owned())
        }
    }
}

/// Reads the whole request payload into memory.
///
/// This consumes the payload stream; the caller must set a replay afterwards.
async fn read_and_buffer_body(req: &mut ServiceRequest) -> Result<Bytes, PayloadError> {
    let mut payload = req.take_payload();
    let mut buffer = BytesMut::new();

    while let Some(chunk) = payload.next().await {
        buffer.extend_from_slice(&chunk?);
    }

    Ok(buffer.freeze())
}
