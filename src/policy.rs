//! Policy hooks supplied by the embedding application
//!
//! Every hook has a pass-through default, so applications override only
//! what they need.

use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use actix_web::HttpRequest;

use crate::event::Event;

/// Response metadata visible to policy hooks
#[derive(Debug, Clone, Copy)]
pub struct ResponseMeta<'a> {
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
}

/// Application-side decisions about what gets captured and sent
pub trait PolicyHooks: Send + Sync {
    /// Bypass capture entirely for this request.
    ///
    /// Runs before the downstream chain, so only request metadata is available.
    fn skip(&self, _req: &HttpRequest) -> bool {
        false
    }

    fn api_version(&self, _req: &HttpRequest, _res: &ResponseMeta<'_>) -> Option<String> {
        None
    }

    fn identify_user(&self, _req: &HttpRequest, _res: &ResponseMeta<'_>) -> Option<String> {
        None
    }

    fn session_token(&self, _req: &HttpRequest, _res: &ResponseMeta<'_>) -> Option<String> {
        None
    }

    fn tags(&self, _req: &HttpRequest, _res: &ResponseMeta<'_>) -> Option<String> {
        None
    }

    /// Produce the event that will actually leave the process.
    ///
    /// Returning `None` (or an event that no longer identifies a request)
    /// is a configuration error: the event is dropped and logged.
    fn mask_content(&self, event: Event) -> Option<Event> {
        Some(event)
    }
}

/// Hooks that capture everything and mask nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicy;

impl PolicyHooks for DefaultPolicy {}
