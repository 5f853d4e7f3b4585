use std::{
    borrow::Cow,
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex},
};

/// Destination for everything the request logger produces.
///
/// Implementations must be internally synchronized: the same sink is shared by
/// every worker and every in-flight request. Writes are fire-and-forget, a
/// failing write is the sink's own concern.
pub trait Sink: Send + Sync {
    /// Write pre-rendered bytes as is (columns output, route traces).
    fn write_raw(&self, bytes: &[u8]);

    /// Emit a line for a successful request.
    fn info(&self, line: &str);

    /// Emit a line for a non-successful request.
    fn warn(&self, line: &str);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write_raw(&self, bytes: &[u8]) {
        (**self).write_raw(bytes)
    }

    fn info(&self, line: &str) {
        (**self).info(line)
    }

    fn warn(&self, line: &str) {
        (**self).warn(line)
    }
}

/// Default sink backed by the `log` crate.
///
/// Lines go through `log::logger()` at `Info`/`Warn` level, raw output goes to
/// stdout unless another writer is configured.
///
/// # Examples
/// ```rust
/// use actix_web_middleware_request_logger::{Config, LogSink, RequestLogger};
///
/// let logger = RequestLogger::new(
///     Config::default().sink(LogSink::new().log_target("http_access")),
/// );
/// ```
pub struct LogSink {
    log_target: Cow<'static, str>,
    raw: Option<Mutex<Box<dyn Write + Send>>>,
}

impl LogSink {
    pub fn new() -> Self {
        LogSink {
            log_target: Cow::Borrowed("actix_web_middleware_request_logger::logger"),
            raw: None,
        }
    }

    /// Sets the logging target to `target`.
    ///
    /// By default, the log target is `actix_web_middleware_request_logger::logger`.
    ///
    /// # Examples
    /// Using `.log_target("http_log")` would have this effect on request logs:
    /// ```diff
    /// - [2015-10-21T07:28:00Z INFO  actix_web_middleware_request_logger::logger] 200 1.2ms 127.0.0.1 GET /
    /// + [2015-10-21T07:28:00Z INFO  http_log] 200 1.2ms 127.0.0.1 GET /
    ///                               ^^^^^^^^
    /// ```
    pub fn log_target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.log_target = target.into();
        self
    }

    /// Send raw output (columns, route traces) to `writer` instead of stdout.
    pub fn raw_writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.raw = Some(Mutex::new(Box::new(writer)));
        self
    }

    pub fn target(&self) -> &str {
        self.log_target.as_ref()
    }

    // access lines have no meaningful source location
    fn emit(&self, level: log::Level, line: &str) {
        crate::wrapper::rust_log::log(level, self.log_target.as_ref(), module_path!(), None, line);
    }
}

impl Default for LogSink {
    fn default() -> Self {
        LogSink::new()
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("log_target", &self.log_target)
            .field("raw_writer", &self.raw.is_some())
            .finish()
    }
}

impl Sink for LogSink {
    fn write_raw(&self, bytes: &[u8]) {
        match &self.raw {
            Some(raw) => {
                // a poisoned writer only means another request panicked mid-write
                let mut writer = raw.lock().unwrap_or_else(|e| e.into_inner());
                let _ = writer.write_all(bytes).and_then(|_| writer.flush());
            }
            None => {
                let mut stdout = io::stdout().lock();
                let _ = stdout.write_all(bytes).and_then(|_| stdout.flush());
            }
        }
    }

    fn info(&self, line: &str) {
        self.emit(log::Level::Info, line)
    }

    fn warn(&self, line: &str) {
        self.emit(log::Level::Warn, line)
    }
}
