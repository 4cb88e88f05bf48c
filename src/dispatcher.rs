//! Fire-and-forget event dispatch
//!
//! `send` masks the event on the caller's task, then hands it to a spawned
//! tokio task and returns. Collector outcomes come back only through a
//! [`CompletionHandler`], which never reaches the request path.
//!
//! Per event: `Assembled -> Masked -> Dispatched -> Acknowledged | Failed`,
//! or `Assembled -> Dropped` when masking yields nothing sendable.

use std::sync::Arc;

use crate::client::CollectorClient;
use crate::error::TraceError;
use crate::event::Event;
use crate::policy::PolicyHooks;

/// Outcome of a collector call
#[derive(Debug)]
pub enum Completion {
    Acknowledged,
    Failed(TraceError),
}

/// Receives collector outcomes, possibly on another task than the request
pub trait CompletionHandler: Send + Sync {
    fn on_complete(&self, completion: Completion);
}

/// Logs collector outcomes; successes only in debug mode
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCompletion {
    pub debug: bool,
}

impl CompletionHandler for LoggingCompletion {
    fn on_complete(&self, completion: Completion) {
        match completion {
            Completion::Acknowledged => {
                if self.debug {
                    tracing::info!("event sent to collector");
                }
            }
            Completion::Failed(err) => {
                tracing::warn!(error = %err, "failed to send event to collector");
            }
        }
    }
}

/// State an event reached when `send` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Handed to the collector task
    Dispatched,
    /// Masking produced no sendable event
    Dropped,
}

/// Masks events and ships them without blocking the caller
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn CollectorClient>,
    policy: Arc<dyn PolicyHooks>,
    completion: Arc<dyn CompletionHandler>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn CollectorClient>,
        policy: Arc<dyn PolicyHooks>,
        completion: Arc<dyn CompletionHandler>,
    ) -> Self {
        Self {
            client,
            policy,
            completion,
        }
    }

    /// Mask `event` and start sending it.
    ///
    /// Must be called from within a tokio runtime. Returns as soon as the
    /// send task is spawned; never returns an error.
    pub fn send(&self, event: Event) -> DispatchState {
        let masked = match mask(self.policy.as_ref(), event) {
            Ok(masked) => masked,
            Err(err) => {
                tracing::error!(error = %err, "mask_content() produced an unusable event, dropping it");
                return DispatchState::Dropped;
            }
        };

        let send = self.client.create_event(masked);
        let completion = self.completion.clone();

        tokio::spawn(async move {
            let outcome = match send.await {
                Ok(()) => Completion::Acknowledged,
                Err(err) => Completion::Failed(err),
            };
            completion.on_complete(outcome);
        });

        DispatchState::Dispatched
    }
}

fn mask(policy: &dyn PolicyHooks, event: Event) -> Result<Event, TraceError> {
    match policy.mask_content(event) {
        Some(masked) if masked.is_valid() => Ok(masked),
        Some(_) => Err(TraceError::InvalidMaskedEvent(
            "masked event has no request uri or verb".to_string(),
        )),
        None => Err(TraceError::InvalidMaskedEvent(
            "mask_content() returned None".to_string(),
        )),
    }
}
