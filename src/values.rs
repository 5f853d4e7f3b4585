use std::{collections::HashMap, fmt::Display};

use actix_web::HttpMessage;

/// String-keyed values attached to a request for the access log.
///
/// Handlers put values here and the request logger picks the ones listed in
/// [`Config::message_context_keys`](crate::Config::message_context_keys) once
/// the handler chain has finished. Values are rendered with `Display` when
/// inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogValues(HashMap<String, String>);

impl LogValues {
    pub fn new() -> Self {
        LogValues::default()
    }

    pub fn insert<K: Into<String>, V: Display>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Access to [`LogValues`] from anything that carries request extensions.
///
/// ```rust
/// use actix_web::{HttpRequest, HttpResponse};
/// use actix_web_middleware_request_logger::LogValuesExt;
///
/// async fn index(req: HttpRequest) -> HttpResponse {
///     req.set_log_value("user", "alice");
///     HttpResponse::Ok().finish()
/// }
/// ```
pub trait LogValuesExt {
    fn set_log_value<K: Into<String>, V: Display>(&self, key: K, value: V);

    fn log_value(&self, key: &str) -> Option<String>;
}

impl<T: HttpMessage> LogValuesExt for T {
    fn set_log_value<K: Into<String>, V: Display>(&self, key: K, value: V) {
        let mut ext = self.extensions_mut();
        match ext.get_mut::<LogValues>() {
            Some(values) => values.insert(key, value),
            None => {
                let mut values = LogValues::new();
                values.insert(key, value);
                ext.insert(values);
            }
        }
    }

    fn log_value(&self, key: &str) -> Option<String> {
        self.extensions()
            .get::<LogValues>()
            .and_then(|values| values.get(key))
            .map(str::to_owned)
    }
}

/// Join the non-empty values in order with single spaces.
///
/// Yields `None` when there is nothing to join, so an empty key list never
/// shows up in the output.
pub(crate) fn aggregate<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut message: Option<String> = None;
    for value in values.into_iter().flatten() {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        match message.as_mut() {
            Some(message) => {
                message.push(' ');
                message.push_str(value);
            }
            None => message = Some(value.to_owned()),
        }
    }
    message
}
