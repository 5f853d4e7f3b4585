//! Route tracing: which handlers of a route's chain actually ran.
//!
//! actix-web does not expose the handler chain behind a resource, so the
//! application describes it once at startup with a [`RouteTable`], and the
//! handlers report how far the request got through [`HandlerIndexExt`].

use std::collections::HashMap;
use std::fmt::Write;

use actix_web::{HttpMessage, HttpRequest, http::Method};

const EXECUTED: &str = "✓";
const PENDING: &str = "•";

/// Registered handler chains, keyed by method and route pattern.
///
/// # Examples
/// ```rust
/// use actix_web::http::Method;
/// use actix_web_middleware_request_logger::{Config, RequestLogger, RouteTable};
///
/// let routes = RouteTable::new()
///     .register_handler_name(RequestLogger::HANDLER_ID, RequestLogger::HANDLER_NAME)
///     .register_handler_name("app::users::show", "users.show")
///     .route(
///         Method::GET,
///         "/users/{id}",
///         [RequestLogger::HANDLER_ID, "app::auth", "app::users::show"],
///     );
///
/// let logger = RequestLogger::new(Config::default().trace_route(routes));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(Method, String), Vec<String>>,
    names: HashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    /// Register the handler chain served for `method` on `pattern`.
    ///
    /// `pattern` is the resource pattern as actix-web reports it from
    /// `HttpRequest::match_pattern`, e.g. `/users/{id}`.
    pub fn route<P, I, T>(mut self, method: Method, pattern: P, handlers: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.routes.insert(
            (method, pattern.into()),
            handlers.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Show handler `id` as `name` in traces.
    pub fn register_handler_name<I: Into<String>, N: Into<String>>(mut self, id: I, name: N) -> Self {
        self.names.insert(id.into(), name.into());
        self
    }

    pub fn handler_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map(String::as_str).unwrap_or(id)
    }

    /// The registered route `req` was matched against, if any.
    pub fn matched(&self, req: &HttpRequest) -> Option<Route<'_>> {
        let pattern = req.match_pattern()?;
        let ((method, pattern), handlers) = self
            .routes
            .get_key_value(&(req.method().clone(), pattern))?;
        Some(Route {
            table: self,
            method,
            pattern,
            handlers,
        })
    }
}

/// A matched entry of a [`RouteTable`].
#[derive(Debug, Clone, Copy)]
pub struct Route<'a> {
    table: &'a RouteTable,
    method: &'a Method,
    pattern: &'a str,
    handlers: &'a [String],
}

impl Route<'_> {
    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn pattern(&self) -> &str {
        self.pattern
    }

    /// Render the chain, marking every handler up to `executed` as run.
    ///
    /// With `None` (unknown, or execution stopped early) nothing is marked.
    pub fn trace(&self, executed: Option<usize>) -> String {
        let mut out = format!("{} {}\n", self.method, self.pattern);
        for (i, id) in self.handlers.iter().enumerate() {
            let mark = match executed {
                Some(last) if i <= last => EXECUTED,
                _ => PENDING,
            };
            let _ = writeln!(out, "  {mark} {}", self.table.handler_name(id));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HandlerIndex(usize);

/// Progress of a request through its route's handler chain.
pub trait HandlerIndexExt {
    /// Record that the handler at `index` of the chain has been reached.
    fn set_handler_index(&self, index: usize);

    /// Forget the progress, as when execution is stopped early.
    fn reset_handler_index(&self);

    fn handler_index(&self) -> Option<usize>;
}

impl<T: HttpMessage> HandlerIndexExt for T {
    fn set_handler_index(&self, index: usize) {
        self.extensions_mut().insert(HandlerIndex(index));
    }

    fn reset_handler_index(&self) {
        self.extensions_mut().remove::<HandlerIndex>();
    }

    fn handler_index(&self) -> Option<usize> {
        self.extensions().get::<HandlerIndex>().map(|idx| idx.0)
    }
}
