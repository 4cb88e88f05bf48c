//! Convenience re-exports for easy importing
//!
//! Import everything you need with:
//! ```rust
//! use apitrace_actix::prelude::*;
//! ```

pub use crate::config::Config;
pub use crate::error::TraceError;
pub use crate::event::Event;
pub use crate::middleware::ApiTraceMiddleware;
pub use crate::policy::{PolicyHooks, ResponseMeta};
