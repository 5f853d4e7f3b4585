//! Actix-web middleware for configurable request logs.
//! This middleware inspired by the `actix-web`'s `Logger` middleware.
//!
//! # Examples:
//! ## By default middleware writes through the standard `log` crate.
//! ```bash
//! cargo add actix-web-middleware-request-logger
//! ```
//! Example usage with standard `log` crate and `structured_logger` crate:
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use actix_web_middleware_request_logger::RequestLogger;
//! use tokio;
//! use structured_logger::{Builder, async_json::new_writer};
//!
//! #[actix_web::main] // or #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     Builder::new()
//!         .with_target_writer("*", new_writer(tokio::io::stdout()))
//!         .init();
//!
//!     HttpServer::new(|| {
//!         App::new()
//!             .wrap(RequestLogger::default())
//!             .route("/", web::get().to(|| async { "Hello world!" }))
//!     })
//!     .bind("127.0.0.1:8080")?;
//!     Ok(())
//! }
//! ```
//! Every request then produces a line such as `200 1.2ms 127.0.0.1 GET /`,
//! logged at `warn` level when the status is not 2xx or 3xx.
//!
//! # Features
//! - Field selection (status, latency, client IP, method, path with or without query)
//! - Values attached by handlers and request headers appended to the line
//! - Aligned columns output
//! - Custom output callbacks
//! - Path exclusions (exact, prefix, regex) or a custom skip predicate
//! - Route tracing: which handlers of the matched route ran
//!
//! # Configuration
//!
//! ## Custom Fields
//!
//! ```rust
//! use actix_web_middleware_request_logger::{Config, RequestLogger};
//!
//! let logger = RequestLogger::new(
//!     Config::default()
//!         .ip(false)                          // no client address
//!         .query(true)                        // path with query string
//!         .path_after_handler(true)           // read the path again after the handler
//!         .message_context_key("user")        // value set by handlers, see `LogValuesExt`
//!         .message_header_key("user-agent")   // request header
//!         .columns(true),                     // aligned table instead of a line
//! );
//! ```
//! ## Path Exclusions
//!
//! ```rust
//! use actix_web_middleware_request_logger::{Config, RequestLogger};
//!
//! let logger = RequestLogger::new(
//!     Config::default()
//!         .exclude("/health")
//!         .exclude_prefix("/assets/")
//!         .exclude_regex(r"^/metrics(/.*)?$"),
//! );
//! ```
//!
//! or a predicate, which replaces any exclusion:
//!
//! ```rust
//! use actix_web::http::Method;
//! use actix_web_middleware_request_logger::{Config, RequestLogger};
//!
//! let logger = RequestLogger::new(
//!     Config::default().skip(|req| *req.method() == Method::OPTIONS),
//! );
//! ```
//! ## Custom Output
//!
//! ```rust
//! use actix_web_middleware_request_logger::{Config, RequestLogger};
//!
//! let logger = RequestLogger::new(Config::default().log_fn(|record| {
//!     println!("{:?} {:?} took {:?}", record.method, record.path, record.latency);
//! }));
//! ```

mod config;
pub mod format;
mod logger;
mod sink;
mod trace;
mod values;
mod wrapper;

pub use crate::config::{Config, LogFn, LogFnCtx, Output, SkipFn};
pub use crate::logger::{AccessRecord, RequestLogger};
pub use crate::sink::{LogSink, Sink};
pub use crate::trace::{HandlerIndexExt, Route, RouteTable};
pub use crate::values::{LogValues, LogValuesExt};
pub use crate::wrapper::rust_log;
