//! Response body capture for the ApiTrace middleware
//!
//! Every chunk the downstream handler produces is buffered before anything
//! reaches the client. Status and headers are therefore final by the time
//! they are captured, and the client later receives the buffered bytes
//! unchanged through [`CapturedResponse::into_response`].
//!
//! When the handler's body stream fails part way, the client still gets the
//! head the handler chose, the bytes produced so far and then the same
//! error, through [`FailedResponse::into_response`].

use actix_web::body::{self, BodySize, BodyStream, BoxBody, MessageBody};
use actix_web::dev::ServiceResponse;
use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use actix_web::web::{Bytes, BytesMut};
use actix_web::{HttpRequest, HttpResponse};
use futures::stream;
use std::future::poll_fn;
use std::pin::pin;

use crate::headers::HeaderMultimap;

/// Error produced by the downstream response body stream
pub type BodyError = Box<dyn std::error::Error>;

/// A fully buffered response waiting to be flushed to the client
pub struct CapturedResponse {
    request: HttpRequest,
    head: HttpResponse<()>,
    body: Bytes,
    bodyless: bool,
    writes: usize,
}

impl CapturedResponse {
    /// Drain the response body produced by the handler.
    ///
    /// A failing body stream yields a [`FailedResponse`] that still carries
    /// the head and the bytes read before the failure.
    pub async fn capture<B>(res: ServiceResponse<B>) -> Result<Self, FailedResponse>
    where
        B: MessageBody,
    {
        let (request, res) = res.into_parts();
        let (head, body) = res.into_parts();
        let bodyless = matches!(body.size(), BodySize::None);

        let (body, writes) = match body_to_bytes(body).await {
            Ok(drained) => drained,
            Err((partial, error)) => {
                return Err(FailedResponse {
                    request,
                    head,
                    partial,
                    error,
                })
            }
        };

        Ok(Self {
            request,
            head,
            body,
            bodyless,
            writes,
        })
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.head.status()
    }

    pub fn header_map(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn headers(&self) -> HeaderMultimap {
        HeaderMultimap::from(self.head.headers())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.head
            .headers()
            .get(actix_web::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
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

    /// Number of chunks the handler's body produced
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Hand the buffered response to the real client.
    ///
    /// Consumes the capture, so the bytes are flushed exactly once.
    pub fn into_response(self) -> ServiceResponse<BoxBody> {
        let res = if self.bodyless {
            self.head.set_body(body::None::new()).map_into_boxed_body()
        } else {
            self.head.set_body(self.body).map_into_boxed_body()
        };
        ServiceResponse::new(self.request, res)
    }
}

/// A response whose body stream failed while it was being buffered
pub struct FailedResponse {
    request: HttpRequest,
    head: HttpResponse<()>,
    partial: Bytes,
    error: BodyError,
}

impl FailedResponse {
    pub fn status(&self) -> StatusCode {
        self.head.status()
    }

    /// Bytes the handler produced before the stream failed
    pub fn partial(&self) -> &Bytes {
        &self.partial
    }

    pub fn error(&self) -> &BodyError {
        &self.error
    }

    /// Rebuild the response the handler would have sent: same head, the
    /// partial bytes, then the original error from the body stream.
    pub fn into_response(self) -> ServiceResponse<BoxBody> {
        let mut chunks = Vec::with_capacity(2);
        if !self.partial.is_empty() {
            chunks.push(Ok(self.partial));
        }
        chunks.push(Err(self.error));

        let res = self
            .head
            .set_body(BodyStream::new(stream::iter(chunks)))
            .map_into_boxed_body();
        ServiceResponse::new(self.request, res)
    }
}

impl std::fmt::Debug for FailedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailedResponse")
            .field("status", &self.head.status())
            .field("partial", &self.partial.len())
            .field("error", &self.error)
            .finish()
    }
}

/// Collects every chunk of a body, in order, into one buffer.
///
/// On failure the bytes buffered so far are returned alongside the error.
async fn body_to_bytes<B: MessageBody>(body: B) -> Result<(Bytes, usize), (Bytes, BodyError)> {
    let cap = match body.size() {
        BodySize::None | BodySize::Sized(0) => return Ok((Bytes::new(), 0)),
        BodySize::Sized(size) => size as usize,
        BodySize::Stream => 0,
    };

    let mut buf = BytesMut::with_capacity(cap);
    let mut writes = 0;
    let mut body = pin!(body);

    while let Some(chunk) = poll_fn(|cx| body.as_mut().poll_next(cx)).await {
        match chunk {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(err) => return Err((buf.freeze(), err.into())),
        }
        writes += 1;
    }

    Ok((buf.freeze(), writes))
}
