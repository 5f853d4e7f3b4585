use std::{collections::HashSet, fmt, sync::Arc, time::Duration};

use actix_web::dev::{ServiceRequest, ServiceResponse};
use regex::Regex;

use crate::logger::AccessRecord;
use crate::sink::{LogSink, Sink};
use crate::trace::RouteTable;

/// Callback that takes over output entirely, given the captured fields.
pub type LogFn = Arc<dyn Fn(&AccessRecord) + Send + Sync>;

/// Callback that takes over output entirely, given the full response and latency.
pub type LogFnCtx = Arc<dyn Fn(&ServiceResponse, Duration) + Send + Sync>;

/// Predicate deciding whether a request bypasses the logger.
pub type SkipFn = Arc<dyn Fn(&ServiceRequest) -> bool + Send + Sync>;

/// Request logger configuration.
///
/// All fields are enabled by default except columns output and route
/// tracing. There is no skip rule and the path is captured before the
/// handler runs, without the query string.
///
/// # Examples
/// ```rust
/// use actix_web_middleware_request_logger::{Config, RequestLogger};
///
/// let logger = RequestLogger::new(
///     Config::default()
///         .ip(false)
///         .query(true)
///         .message_context_key("user")
///         .message_header_key("user-agent")
///         .exclude("/health")
///         .exclude_prefix("/assets/"),
/// );
/// ```
#[derive(Clone)]
pub struct Config {
    pub(crate) status: bool,
    pub(crate) ip: bool,
    pub(crate) method: bool,
    pub(crate) path: bool,
    pub(crate) query: bool,
    pub(crate) path_after_handler: bool,
    pub(crate) columns: bool,
    pub(crate) message_context_keys: Vec<String>,
    pub(crate) message_header_keys: Vec<String>,
    skip: Option<SkipFn>,
    exclude: Exclusions,
    log_fn: Option<LogFn>,
    log_fn_ctx: Option<LogFnCtx>,
    pub(crate) routes: Option<Arc<RouteTable>>,
    pub(crate) sink: Arc<dyn Sink>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            status: true,
            ip: true,
            method: true,
            path: true,
            query: false,
            path_after_handler: false,
            columns: false,
            message_context_keys: Vec::new(),
            message_header_keys: Vec::new(),
            skip: None,
            exclude: Exclusions::default(),
            log_fn: None,
            log_fn_ctx: None,
            routes: None,
            sink: Arc::new(LogSink::default()),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Log the response status code.
    pub fn status(mut self, enabled: bool) -> Self {
        self.status = enabled;
        self
    }

    /// Log the client address, taken from `Forwarded`/`X-Forwarded-For` or the peer address.
    pub fn ip(mut self, enabled: bool) -> Self {
        self.ip = enabled;
        self
    }

    pub fn method(mut self, enabled: bool) -> Self {
        self.method = enabled;
        self
    }

    pub fn path(mut self, enabled: bool) -> Self {
        self.path = enabled;
        self
    }

    /// Include the query string in the logged path.
    pub fn query(mut self, enabled: bool) -> Self {
        self.query = enabled;
        self
    }

    /// Read the path again once the handler chain has finished.
    ///
    /// The second read wins, and it is logged even when [`path`](Config::path)
    /// is disabled.
    pub fn path_after_handler(mut self, enabled: bool) -> Self {
        self.path_after_handler = enabled;
        self
    }

    /// Write an aligned `Time | Status | Latency | ...` table instead of a plain line.
    pub fn columns(mut self, enabled: bool) -> Self {
        self.columns = enabled;
        self
    }

    /// Print the handler chain of the matched route after each request.
    pub fn trace_route(mut self, routes: RouteTable) -> Self {
        self.routes = Some(Arc::new(routes));
        self
    }

    /// Append the [`LogValues`](crate::LogValues) entry stored under `key` to the message.
    pub fn message_context_key<T: Into<String>>(mut self, key: T) -> Self {
        self.message_context_keys.push(key.into());
        self
    }

    pub fn message_context_keys<I, T>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.message_context_keys
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Append the request header `key` to the header message.
    pub fn message_header_key<T: Into<String>>(mut self, key: T) -> Self {
        self.message_header_keys.push(key.into());
        self
    }

    pub fn message_header_keys<I, T>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.message_header_keys
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Do not log requests for which `skip` returns `true`.
    ///
    /// Takes precedence over [`exclude`](Config::exclude) and friends.
    pub fn skip<F>(mut self, skip: F) -> Self
    where
        F: Fn(&ServiceRequest) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(skip));
        self
    }

    /// Ignore and do not log access info for specified path.
    pub fn exclude<T: Into<String>>(mut self, path: T) -> Self {
        self.exclude.paths.insert(path.into());
        self
    }

    /// Ignore and do not log access info for paths starting with `prefix`.
    pub fn exclude_prefix<T: Into<String>>(mut self, prefix: T) -> Self {
        self.exclude.prefixes.push(prefix.into());
        self
    }

    /// Ignore and do not log access info for paths that match regex.
    ///
    /// An invalid pattern is reported with `log::warn!` and ignored.
    pub fn exclude_regex<T: Into<String>>(mut self, path: T) -> Self {
        let path = path.into();
        match Regex::new(&path) {
            Ok(re) => self.exclude.regexes.push(re),
            Err(err) => log::warn!("ignoring invalid exclude pattern {path:?}: {err}"),
        }
        self
    }

    /// Hand every record to `f` instead of writing anything.
    pub fn log_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&AccessRecord) + Send + Sync + 'static,
    {
        self.log_fn = Some(Arc::new(f));
        self
    }

    /// Hand the response and latency to `f` instead of writing anything.
    ///
    /// Ignored when [`log_fn`](Config::log_fn) is set.
    pub fn log_fn_ctx<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceResponse, Duration) + Send + Sync + 'static,
    {
        self.log_fn_ctx = Some(Arc::new(f));
        self
    }

    /// Where lines and raw output go. Defaults to [`LogSink`].
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Resolve the single skip rule, if any.
    pub(crate) fn build_skipper(&self) -> Option<SkipFn> {
        match (&self.skip, self.exclude.is_empty()) {
            (Some(skip), excludes_empty) => {
                if !excludes_empty {
                    log::warn!("skip predicate configured, path exclusions are ignored");
                }
                Some(Arc::clone(skip))
            }
            (None, true) => None,
            (None, false) => {
                let exclude = self.exclude.clone();
                let skip: SkipFn = Arc::new(move |req: &ServiceRequest| exclude.matches(req.path()));
                Some(skip)
            }
        }
    }

    /// Resolve the single output strategy.
    pub(crate) fn build_output(&self) -> Output {
        match (&self.log_fn, &self.log_fn_ctx) {
            (Some(f), ctx) => {
                if ctx.is_some() {
                    log::warn!("both log_fn and log_fn_ctx configured, log_fn_ctx is ignored");
                }
                Output::Func(Arc::clone(f))
            }
            (None, Some(f)) => Output::Context(Arc::clone(f)),
            (None, None) if self.columns => Output::Columns,
            (None, None) => Output::Line,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("status", &self.status)
            .field("ip", &self.ip)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("path_after_handler", &self.path_after_handler)
            .field("columns", &self.columns)
            .field("message_context_keys", &self.message_context_keys)
            .field("message_header_keys", &self.message_header_keys)
            .field("skip", &self.skip.is_some())
            .field("exclude", &self.exclude)
            .field("log_fn", &self.log_fn.is_some())
            .field("log_fn_ctx", &self.log_fn_ctx.is_some())
            .field("trace_route", &self.routes.is_some())
            .finish_non_exhaustive()
    }
}

/// How a finished request is reported. Exactly one applies per logger.
#[derive(Clone)]
pub enum Output {
    Func(LogFn),
    Context(LogFnCtx),
    Columns,
    Line,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Func(_) => f.write_str("Func"),
            Output::Context(_) => f.write_str("Context"),
            Output::Columns => f.write_str("Columns"),
            Output::Line => f.write_str("Line"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Exclusions {
    paths: HashSet<String>,
    prefixes: Vec<String>,
    regexes: Vec<Regex>,
}

impl Exclusions {
    fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.prefixes.is_empty() && self.regexes.is_empty()
    }

    fn matches(&self, path: &str) -> bool {
        self.paths.contains(path)
            || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || self.regexes.iter().any(|r| r.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn skipped(skip: &SkipFn, uri: &str) -> bool {
        skip(&TestRequest::default().uri(uri).to_srv_request())
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.status);
        assert!(config.ip);
        assert!(config.method);
        assert!(config.path);
        assert!(!config.query);
        assert!(!config.path_after_handler);
        assert!(!config.columns);
        assert!(config.routes.is_none());
        assert!(config.message_context_keys.is_empty());
        assert!(config.message_header_keys.is_empty());
        assert!(config.build_skipper().is_none());
        assert!(matches!(config.build_output(), Output::Line));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .status(false)
            .ip(false)
            .method(false)
            .path(false)
            .query(true)
            .path_after_handler(true)
            .columns(true)
            .message_context_key("a")
            .message_context_keys(["b", "c"])
            .message_header_keys(vec!["user-agent".to_string()])
            .message_header_key("referer");

        assert!(!config.status && !config.ip && !config.method && !config.path);
        assert!(config.query && config.path_after_handler && config.columns);
        assert_eq!(config.message_context_keys, ["a", "b", "c"]);
        assert_eq!(config.message_header_keys, ["user-agent", "referer"]);
        assert!(matches!(config.build_output(), Output::Columns));
    }

    #[test]
    fn test_build_skipper_from_exclusions() {
        let config = Config::default()
            .exclude("/health")
            .exclude_prefix("/assets/")
            .exclude_regex(r"^/api/v1/.*")
            .exclude_regex("(unclosed");

        assert_eq!(config.exclude.regexes.len(), 1);
        let skip = config.build_skipper().unwrap();

        assert!(skipped(&skip, "/health"));
        assert!(!skipped(&skip, "/health/deep"));
        assert!(skipped(&skip, "/assets/app.js"));
        assert!(skipped(&skip, "/api/v1/users"));
        assert!(!skipped(&skip, "/api/v2/users"));
        assert!(!skipped(&skip, "/"));
    }

    #[test]
    fn test_build_skipper_predicate_wins() {
        let config = Config::default()
            .exclude("/health")
            .skip(|req| *req.method() == actix_web::http::Method::OPTIONS);
        let skip = config.build_skipper().unwrap();

        assert!(!skipped(&skip, "/health"));
        let req = TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/anything")
            .to_srv_request();
        assert!(skip(&req));
    }

    #[test]
    fn test_skip_everything_is_valid() {
        let skip = Config::default().skip(|_| true).build_skipper().unwrap();
        assert!(skipped(&skip, "/"));
        assert!(skipped(&skip, "/any/path"));
    }

    #[test]
    fn test_build_output_priority() {
        let config = Config::default()
            .columns(true)
            .log_fn_ctx(|_, _| {})
            .log_fn(|_| {});
        assert!(matches!(config.build_output(), Output::Func(_)));

        let config = Config::default().columns(true).log_fn_ctx(|_, _| {});
        assert!(matches!(config.build_output(), Output::Context(_)));
    }
}
