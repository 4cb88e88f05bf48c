//! HTTP client for sending events to the collector
//!
//! The middleware talks to the collector only through [`CollectorClient`].
//! [`HttpCollector`] is the reqwest-backed default; it is shared by every
//! request, and `reqwest::Client` is safe for concurrent use.

use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::TraceError;
use crate::event::Event;

/// Header carrying the application id on every collector call
pub const APPLICATION_ID_HEADER: &str = "X-ApiTrace-Application-Id";

/// Remote collector accepting finished events
pub trait CollectorClient: Send + Sync {
    /// Submit one event. Retries, if any, are the implementation's business.
    fn create_event(&self, event: Event) -> BoxFuture<'static, Result<(), TraceError>>;
}

/// Collector reached over HTTP POST with a JSON body
#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: Client,
    endpoint: String,
    application_id: String,
    debug: bool,
}

impl HttpCollector {
    /// Build a collector client from configuration
    ///
    /// Fails with `MissingConfig` when no application id is set.
    pub fn new(config: &Config) -> Result<Self, TraceError> {
        let application_id = config.get_application_id()?.to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/events", config.base_url.trim_end_matches('/')),
            application_id,
            debug: config.debug,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CollectorClient for HttpCollector {
    fn create_event(&self, event: Event) -> BoxFuture<'static, Result<(), TraceError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let application_id = self.application_id.clone();
        let debug = self.debug;

        Box::pin(async move {
            let payload = serde_json::to_vec(&event)?;

            if debug {
                tracing::debug!(
                    %endpoint,
                    payload = %String::from_utf8_lossy(&payload),
                    "sending event to collector"
                );
            }

            let response = client
                .post(&endpoint)
                .header(APPLICATION_ID_HEADER, application_id)
                .header("Content-Type", "application/json")
                .body(payload)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(TraceError::CollectorRejected(response.status()));
            }

            Ok(())
        })
    }
}
