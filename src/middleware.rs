//! Actix-Web middleware implementation for ApiTrace
//!
//! For each request: drain and replay the request body, run the downstream
//! chain, buffer the response, assemble an event, dispatch it in the
//! background and only then hand the buffered response to the client.
//! Nothing here changes the bytes or status the client receives.

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{CONNECTION, CONTENT_TYPE, UPGRADE},
    Error, HttpRequest,
};
use chrono::Utc;
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::assembler::{build_event, build_request_record, build_response_record};
use crate::client::{CollectorClient, HttpCollector};
use crate::config::Config;
use crate::dispatcher::{CompletionHandler, Dispatcher, LoggingCompletion};
use crate::error::TraceError;
use crate::policy::{DefaultPolicy, PolicyHooks, ResponseMeta};
use crate::request_capture::CapturedRequest;
use crate::response_capture::CapturedResponse;
use crate::utils::{full_url, ClientIpResolver, ForwardedIpResolver};

/// ApiTrace middleware for Actix-Web
///
/// ```rust,no_run
/// use actix_web::App;
/// use apitrace_actix::{ApiTraceMiddleware, Config};
///
/// let app = App::new()
///     .wrap(ApiTraceMiddleware::new(Config::new(Some("my-app-id".into()))));
/// ```
#[derive(Clone)]
pub struct ApiTraceMiddleware {
    config: Arc<Config>,
    policy: Arc<dyn PolicyHooks>,
    ip_resolver: Arc<dyn ClientIpResolver>,
    client: Option<Arc<dyn CollectorClient>>,
    completion: Arc<dyn CompletionHandler>,
}

impl ApiTraceMiddleware {
    /// Middleware sending to the HTTP collector described by `config`.
    ///
    /// An inactive config, or a collector client that cannot be built,
    /// leaves the middleware in pass-through mode.
    pub fn new(config: Config) -> Self {
        let client = if config.active {
            match HttpCollector::new(&config) {
                Ok(collector) => Some(Arc::new(collector) as Arc<dyn CollectorClient>),
                Err(err) => {
                    tracing::warn!(error = %err, "ApiTrace disabled: collector client unavailable");
                    None
                }
            }
        } else {
            None
        };

        Self {
            completion: Arc::new(LoggingCompletion {
                debug: config.debug,
            }),
            config: Arc::new(config),
            policy: Arc::new(DefaultPolicy),
            ip_resolver: Arc::new(ForwardedIpResolver),
            client,
        }
    }

    /// Middleware configured from `APITRACE_*` environment variables
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub fn with_policy(mut self, policy: Arc<dyn PolicyHooks>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ip_resolver(mut self, resolver: Arc<dyn ClientIpResolver>) -> Self {
        self.ip_resolver = resolver;
        self
    }

    /// Replace the collector client. Ignored while the config is inactive.
    pub fn with_client(mut self, client: Arc<dyn CollectorClient>) -> Self {
        if self.config.active {
            self.client = Some(client);
        }
        self
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionHandler>) -> Self {
        self.completion = completion;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn dispatcher(&self) -> Option<Dispatcher> {
        self.client.as_ref().map(|client| {
            Dispatcher::new(client.clone(), self.policy.clone(), self.completion.clone())
        })
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiTraceMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiTraceMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiTraceMiddlewareService {
            service: Rc::new(service),
            config: self.config.clone(),
            policy: self.policy.clone(),
            ip_resolver: self.ip_resolver.clone(),
            dispatcher: self.dispatcher(),
        })
    }
}

/// The actual service that handles each request
pub struct ApiTraceMiddlewareService<S> {
    service: Rc<S>,
    config: Arc<Config>,
    policy: Arc<dyn PolicyHooks>,
    ip_resolver: Arc<dyn ClientIpResolver>,
    dispatcher: Option<Dispatcher>,
}

impl<S, B> Service<ServiceRequest> for ApiTraceMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let dispatcher = match &self.dispatcher {
            Some(dispatcher) => dispatcher.clone(),
            None => return pass_through(&self.service, req),
        };

        if is_upgrade(req.request()) {
            tracing::debug!(path = req.path(), "protocol upgrade, not captured");
            return pass_through(&self.service, req);
        }

        if self.policy.skip(req.request()) {
            return pass_through(&self.service, req);
        }

        let service = self.service.clone();
        let policy = self.policy.clone();
        let ip_resolver = self.ip_resolver.clone();
        let debug = self.config.debug;

        Box::pin(async move {
            let start_time = Utc::now();
            let uri = full_url(req.request());

            let captured_req = CapturedRequest::capture(&mut req)
                .await
                .map_err(TraceError::from)?;
            let ip_address = captured_req.client_ip(ip_resolver.as_ref(), req.request());

            let res = service.call(req).await?;

            if is_event_stream(&res) {
                tracing::debug!(%uri, "event stream response, not captured");
                return Ok(res.map_into_boxed_body());
            }

            let captured_res = match CapturedResponse::capture(res).await {
                Ok(captured) => captured,
                Err(failed) => {
                    tracing::debug!(%uri, error = %failed.error(), "response body failed, not captured");
                    return Ok(failed.into_response());
                }
            };
            let end_time = Utc::now();

            let http_req = captured_res.request();
            let meta = ResponseMeta {
                status: captured_res.status(),
                headers: captured_res.header_map(),
            };

            let request_record = build_request_record(
                &captured_req,
                uri,
                ip_address,
                start_time,
                policy.api_version(http_req, &meta),
            );
            let response_record = build_response_record(&captured_res, end_time);
            let event = build_event(
                request_record,
                response_record,
                policy.identify_user(http_req, &meta),
                policy.session_token(http_req, &meta),
                policy.tags(http_req, &meta),
            );

            let state = dispatcher.send(event);
            if debug {
                tracing::debug!(?state, status = meta.status.as_u16(), "captured request");
            }

            Ok(captured_res.into_response())
        })
    }
}

fn pass_through<S, B>(
    service: &Rc<S>,
    req: ServiceRequest,
) -> LocalBoxFuture<'static, Result<ServiceResponse<BoxBody>, Error>>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    let fut = service.call(req);
    Box::pin(async move {
        let res = fut.await?;
        Ok(res.map_into_boxed_body())
    })
}

fn is_upgrade(req: &HttpRequest) -> bool {
    req.headers().contains_key(UPGRADE)
        || req
            .headers()
            .get(CONNECTION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("upgrade"))
            .unwrap_or(false)
}

fn is_event_stream<B>(res: &ServiceResponse<B>) -> bool {
    res.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/event-stream"))
        .unwrap_or(false)
}
