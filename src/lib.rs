//! # ApiTrace Actix SDK
//!
//! Transparent request/response capture middleware for Actix-Web applications.
//!
//! The middleware observes every request/response pair, rebuilds a structured
//! event (headers, body, status, timing, identity) and ships it to a remote
//! collector in the background. It's designed with these principles:
//!
//! - **Transparent**: the client receives exactly the bytes and status the handler produced
//! - **Non-blocking**: events are sent from a spawned task, never awaited by the request
//! - **Fail-safe**: collector and policy failures are logged, never returned to the client
//! - **Pluggable**: skip, identify, tag and mask decisions come from [`PolicyHooks`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpResponse, HttpServer};
//! use apitrace_actix::{ApiTraceMiddleware, Config};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     HttpServer::new(|| {
//!         App::new()
//!             .wrap(ApiTraceMiddleware::new(Config::new(Some("your_application_id".into()))))
//!             .service(web::resource("/").to(|| async { HttpResponse::Ok().body("Hello!") }))
//!     })
//!     .bind("0.0.0.0:8080")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! [`Config::from_env`] reads:
//!
//! - `APITRACE_APPLICATION_ID`: application identifier (required)
//! - `APITRACE_BASE_URL`: collector URL (optional)
//! - `APITRACE_DEBUG`: verbose diagnostics (optional)
//!
//! Without an application id the middleware passes traffic through untouched.
//!
//! ## How It Works
//!
//! 1. `PolicyHooks::skip` may bypass capture for a request
//! 2. The request body is drained once and replayed to the handler
//! 3. The response body is buffered until the handler is done
//! 4. Both bodies are classified as JSON or base64 and an [`Event`] is assembled
//! 5. `PolicyHooks::mask_content` runs, then the event is sent via `tokio::spawn`
//! 6. The buffered response is handed to the client unchanged
//!
//! Diagnostics go through `tracing`; install a subscriber to see them.

pub mod assembler;
pub mod body_codec;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod headers;
pub mod middleware;
pub mod policy;
pub mod prelude;
pub mod request_capture;
pub mod response_capture;
pub mod utils;

// Re-export main components for easy access
pub use body_codec::TransferEncoding;
pub use client::{CollectorClient, HttpCollector};
pub use config::Config;
pub use dispatcher::{Completion, CompletionHandler, DispatchState, Dispatcher};
pub use error::TraceError;
pub use event::{Event, RequestRecord, ResponseRecord};
pub use headers::HeaderMultimap;
pub use middleware::ApiTraceMiddleware;
pub use policy::{PolicyHooks, ResponseMeta};
