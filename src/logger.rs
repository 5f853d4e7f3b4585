use std::{
    future::Future,
    marker::PhantomData,
    net::SocketAddr,
    pin::Pin,
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use futures_core::ready;
use pin_project_lite::pin_project;
use time::OffsetDateTime;

use actix_service::{Service, Transform};
use actix_utils::future::{Ready, ready};
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{Error, HttpMessage, HttpRequest, Result};

use crate::config::{Config, Output, SkipFn};
use crate::format;
use crate::sink::Sink;
use crate::trace::{HandlerIndexExt, RouteTable};
use crate::values::{LogValues, aggregate};

/// Middleware for logging a summary line for every request.
///
/// Fields are captured around the inner service and handed to exactly one
/// output: a record callback, a response callback, an aligned table or a
/// plain line sent to the [`Sink`] at info or warn level depending on the
/// status code.
///
/// # Default Format
/// The [`default`](RequestLogger::default) logger writes
/// `<status> <latency> <ip> <method> <path>` through the `log` crate.
///
/// # Examples
/// ```rust
/// use actix_web::App;
/// use actix_web_middleware_request_logger::RequestLogger;
///
/// let app = App::new()
///     .wrap(RequestLogger::default());
/// ```
pub struct RequestLogger(Rc<Inner>);

struct Inner {
    status: bool,
    ip: bool,
    method: bool,
    path: bool,
    query: bool,
    path_after_handler: bool,
    message_context_keys: Vec<String>,
    message_header_keys: Vec<String>,
    skip: Option<SkipFn>,
    output: Output,
    routes: Option<Arc<RouteTable>>,
    sink: Arc<dyn Sink>,
}

impl RequestLogger {
    /// Id the logger is listed under in a [`RouteTable`] chain.
    pub const HANDLER_ID: &'static str = "actix_web_middleware_request_logger::RequestLogger";

    /// Display name registered for [`HANDLER_ID`](RequestLogger::HANDLER_ID).
    pub const HANDLER_NAME: &'static str = "request-logger";

    /// Create `RequestLogger` middleware with the specified `config`.
    pub fn new(config: Config) -> RequestLogger {
        let skip = config.build_skipper();
        let output = config.build_output();

        RequestLogger(Rc::new(Inner {
            status: config.status,
            ip: config.ip,
            method: config.method,
            path: config.path,
            query: config.query,
            path_after_handler: config.path_after_handler,
            message_context_keys: config.message_context_keys,
            message_header_keys: config.message_header_keys,
            skip,
            output,
            routes: config.routes,
            sink: config.sink,
        }))
    }
}

impl Default for RequestLogger {
    /// Create `RequestLogger` middleware with format:
    ///
    /// Fields:
    /// - Status
    /// - Latency
    /// - IP
    /// - Method
    /// - Path
    fn default() -> Self {
        RequestLogger::new(Config::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddlewareService {
            service,
            inner: Rc::clone(&self.0),
        }))
    }
}

/// Captured data of a single request, handed to the output once the handler
/// chain has finished.
///
/// Disabled fields are `None`. `end_time - start_time` is always exactly
/// `latency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub latency: Duration,
    pub status: Option<String>,
    pub ip: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    /// Values of the configured context keys, space separated.
    pub message: Option<String>,
    /// Values of the configured request headers, space separated.
    pub header_message: Option<String>,
}

/// State captured before the inner service is called.
#[derive(Debug)]
struct Capture {
    started: Instant,
    start_time: OffsetDateTime,
    ip: Option<String>,
    method: Option<String>,
    path: Option<String>,
}

impl Inner {
    fn capture(&self, req: &HttpRequest) -> Capture {
        Capture {
            started: Instant::now(),
            start_time: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
            ip: self.ip.then(|| remote_ip(req)),
            method: self.method.then(|| req.method().to_string()),
            path: self.path.then(|| self.request_path(req)),
        }
    }

    fn finish<B>(&self, capture: Capture, res: &ServiceResponse<B>) -> AccessRecord {
        let latency = capture.started.elapsed();
        let req = res.request();

        let path = if self.path_after_handler {
            Some(self.request_path(req))
        } else {
            capture.path
        };

        let message = {
            let ext = req.extensions();
            let values = ext.get::<LogValues>();
            aggregate(
                self.message_context_keys
                    .iter()
                    .map(|key| values.and_then(|v| v.get(key))),
            )
        };
        let header_message = aggregate(self.message_header_keys.iter().map(|key| {
            req.headers()
                .get(key.as_str())
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
        }));

        AccessRecord {
            start_time: capture.start_time,
            end_time: capture.start_time + latency,
            latency,
            status: self.status.then(|| res.status().as_u16().to_string()),
            ip: capture.ip,
            method: capture.method,
            path,
            message,
            header_message,
        }
    }

    fn request_path(&self, req: &HttpRequest) -> String {
        if self.query {
            req.uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| req.path())
                .to_string()
        } else {
            req.path().to_string()
        }
    }

    fn emit<B>(&self, record: AccessRecord, res: ServiceResponse<B>) -> ServiceResponse<B> {
        let status = res.status();

        let res = match &self.output {
            Output::Func(log_fn) => {
                log_fn(&record);
                res
            }
            Output::Context(log_fn_ctx) => {
                // to avoid polluting the callback type with the body parameter we swap the body
                // out temporarily since it's not usable in the callback anyway
                let (req, res) = res.into_parts();
                let (res, body) = res.into_parts();

                let temp_res = ServiceResponse::new(req, res.map_into_boxed_body());
                log_fn_ctx(&temp_res, record.latency);

                // re-construct original service response
                let (req, res) = temp_res.into_parts();
                ServiceResponse::new(req, res.set_body(body))
            }
            Output::Columns => {
                self.sink.write_raw(format::columns(&record).as_bytes());
                res
            }
            Output::Line => {
                let line = format::line(&record);
                if status_not_successful(status) {
                    self.sink.warn(&line);
                } else {
                    self.sink.info(&line);
                }
                self.trace(res.request());
                res
            }
        };

        res
    }

    /// Only the plain line is followed by a trace, callbacks and columns own their output.
    fn trace(&self, req: &HttpRequest) {
        // nothing to report when the request was served by a default service
        if let Some(route) = self.routes.as_deref().and_then(|routes| routes.matched(req)) {
            self.sink
                .write_raw(route.trace(req.handler_index()).as_bytes());
        }
    }
}

/// Everything outside 2xx and 3xx counts as a failed request.
fn status_not_successful(status: StatusCode) -> bool {
    !(status.is_success() || status.is_redirection())
}

/// Client address without the port.
fn remote_ip(req: &HttpRequest) -> String {
    let info = req.connection_info();
    let addr = info.realip_remote_addr().unwrap_or_default();
    match addr.parse::<SocketAddr>() {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => addr.to_string(),
    }
}

/// Logger middleware service.
pub struct RequestLoggerMiddlewareService<S> {
    inner: Rc<Inner>,
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = RequestLoggerResponse<S, B>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let skipped = self.inner.skip.as_ref().is_some_and(|skip| skip(&req));

        let capture = if skipped {
            None
        } else {
            Some(self.inner.capture(req.request()))
        };

        RequestLoggerResponse {
            fut: self.service.call(req),
            capture,
            inner: Rc::clone(&self.inner),
            _phantom: PhantomData,
        }
    }
}

pin_project! {
    pub struct RequestLoggerResponse<S, B>
    where
        B: MessageBody,
        S: Service<ServiceRequest>,
    {
        #[pin]
        fut: S::Future,
        capture: Option<Capture>,
        inner: Rc<Inner>,
        _phantom: PhantomData<B>,
    }
}

impl<S, B> Future for RequestLoggerResponse<S, B>
where
    B: MessageBody,
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Output = Result<ServiceResponse<B>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let res = match ready!(this.fut.poll(cx)) {
            Ok(res) => res,
            Err(err) => {
                log::debug!("Error from inner service, request not logged: {:?}", err);
                return Poll::Ready(Err(err));
            }
        };

        if let Some(error) = res.response().error() {
            log::debug!("Error in response: {:?}", error);
        }

        let Some(capture) = this.capture.take() else {
            return Poll::Ready(Ok(res));
        };

        let record = this.inner.finish(capture, &res);
        Poll::Ready(Ok(this.inner.emit(record, res)))
    }
}
