//! Utility functions for the ApiTrace SDK
//!
//! Request URL reconstruction and client IP resolution.

use actix_web::HttpRequest;

use crate::headers::HeaderMultimap;

/// Full request URL: `scheme://host/path?query`.
///
/// Absolute-form request targets are returned as they arrived.
pub fn full_url(req: &HttpRequest) -> String {
    let uri = req.uri();
    if uri.scheme().is_some() {
        return uri.to_string();
    }

    let info = req.connection_info();
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}://{}{}", info.scheme(), info.host(), path)
}

/// Resolves the originating client address of a request
pub trait ClientIpResolver: Send + Sync {
    fn client_ip(&self, req: &HttpRequest, headers: &HeaderMultimap) -> Option<String>;
}

/// Proxy-aware resolver used unless the application supplies its own
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardedIpResolver;

impl ClientIpResolver for ForwardedIpResolver {
    fn client_ip(&self, req: &HttpRequest, headers: &HeaderMultimap) -> Option<String> {
        let peer_addr = req.peer_addr().map(|addr| addr.ip().to_string());
        extract_ip(headers, peer_addr.as_deref())
    }
}

/// Extract real IP address from request, handling proxies
///
/// Checks headers in this order:
/// 1. X-Real-IP (set by nginx)
/// 2. X-Forwarded-For (standard proxy header, takes first IP)
/// 3. Falls back to connection peer address
pub fn extract_ip(headers: &HeaderMultimap, peer_addr: Option<&str>) -> Option<String> {
    if let Some(ip) = headers.get("x-real-ip").map(str::trim).filter(|ip| !ip.is_empty()) {
        return Some(ip.to_string());
    }

    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Some(ip) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return Some(ip.to_string());
        }
    }

    peer_addr.map(|s| s.to_string())
}
