//! Error types for the ApiTrace SDK
//!
//! Only [`TraceError::Payload`] is ever allowed to reach the hosting pipeline:
//! it is the request body read failure the caller would have seen without
//! capture. Everything else is absorbed and surfaced through `tracing`.

use actix_web::error::PayloadError;
use thiserror::Error;

/// Main error type for ApiTrace operations
#[derive(Error, Debug)]
pub enum TraceError {
    /// No application id configured
    #[error("Missing configuration: application id not provided")]
    MissingConfig,

    /// Network-related errors (connection, DNS, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Collector answered with a non-success status code
    #[error("Collector rejected event: HTTP {0}")]
    CollectorRejected(reqwest::StatusCode),

    /// JSON serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `mask_content` produced something that cannot be sent
    #[error("Invalid masked event: {0}")]
    InvalidMaskedEvent(String),

    /// Reading the inbound request body failed
    #[error("Request payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Generic error for unexpected failures
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl TraceError {
    /// Create a generic error from any message
    pub fn from_string(msg: impl Into<String>) -> Self {
        TraceError::Other(msg.into())
    }

    /// True for failures that originate in the embedding application's policy
    pub fn is_policy_error(&self) -> bool {
        matches!(self, TraceError::InvalidMaskedEvent(_))
    }
}

impl From<TraceError> for actix_web::Error {
    fn from(err: TraceError) -> Self {
        match err {
            TraceError::Payload(e) => e.into(),
            other => actix_web::error::ErrorInternalServerError(other),
        }
    }
}
