//! Configuration management for the ApiTrace SDK
//!
//! One `Config` value is built at startup and handed to the middleware,
//! which keeps it behind an `Arc` for the rest of the process. A missing
//! application id disables capture without affecting the host application.

use std::sync::Arc;

/// Collector used when `APITRACE_BASE_URL` is not set
pub const DEFAULT_BASE_URL: &str = "https://api.apitrace.dev";

/// Configuration for the ApiTrace SDK
///
/// Loaded from environment variables:
/// - `APITRACE_APPLICATION_ID`: application identifier issued by the collector
/// - `APITRACE_BASE_URL`: optional collector URL, defaults to [`DEFAULT_BASE_URL`]
/// - `APITRACE_DEBUG`: optional flag ("true"/"1"/"yes") for verbose SDK output
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the SDK is active (has an application id)
    pub active: bool,

    /// Application identifier sent with every event
    pub application_id: Option<String>,

    /// Base URL of the collector
    pub base_url: String,

    /// Whether debug diagnostics are emitted
    pub debug: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Never fails: a missing application id yields an inactive config
    /// and a warning.
    pub fn from_env() -> Self {
        let application_id = std::env::var("APITRACE_APPLICATION_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());
        let base_url =
            std::env::var("APITRACE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let debug = match std::env::var("APITRACE_DEBUG") {
            Ok(val) => matches!(val.to_lowercase().as_str(), "true" | "1" | "yes"),
            Err(_) => false,
        };

        let config = Self {
            active: application_id.is_some(),
            application_id,
            base_url,
            debug,
        };
        config.announce();
        config
    }

    /// Create configuration with an explicit application id
    pub fn new(application_id: Option<String>) -> Self {
        let application_id = application_id.filter(|id| !id.trim().is_empty());
        Self {
            active: application_id.is_some(),
            application_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            debug: false,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Toggle debug output.
    ///
    /// This is the only field meant to change after construction, and only
    /// before the config is shared with a middleware.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Get application id (returns error if missing)
    pub fn get_application_id(&self) -> Result<&str, crate::error::TraceError> {
        self.application_id
            .as_deref()
            .ok_or(crate::error::TraceError::MissingConfig)
    }

    /// Wrap config in Arc for thread-safe sharing
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn announce(&self) {
        if !self.active {
            tracing::warn!(
                "ApiTrace disabled: APITRACE_APPLICATION_ID is not set, requests will not be captured"
            );
        } else if self.debug {
            tracing::info!(collector = %self.base_url, "ApiTrace initialized (debug mode)");
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
