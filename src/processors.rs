// Context processors.
use std::collections::HashMap;

use minijinja::Value;

use crate::markup::SafeString;
use crate::request::Request;

pub trait ContextProcessor: Send + Sync {
    fn process(&self, request: &Request) -> HashMap<String, Value>;
}

impl<F> ContextProcessor for F
where
    F: Fn(&Request) -> HashMap<String, Value> + Send + Sync,
{
    fn process(&self, request: &Request) -> HashMap<String, Value> {
        self(request)
    }
}

fn single(name: &str, value: Value) -> HashMap<String, Value> {
    let mut ctx = HashMap::new();
    ctx.insert(name.to_string(), value);
    ctx
}

/// Adds `debug` and an empty `sql_queries` when the host runs in debug mode.
pub struct DebugProcessor {
    pub debug: bool,
}

impl ContextProcessor for DebugProcessor {
    fn process(&self, _request: &Request) -> HashMap<String, Value> {
        if !self.debug {
            return HashMap::new();
        }
        let mut ctx = single("debug", Value::from(true));
        ctx.insert("sql_queries".to_string(), Value::from(Vec::<Value>::new()));
        ctx
    }
}

/// Adds `request`.
pub struct RequestProcessor;

impl ContextProcessor for RequestProcessor {
    fn process(&self, request: &Request) -> HashMap<String, Value> {
        single("request", Value::from_serialize(request))
    }
}

/// Adds `STATIC_URL`.
pub struct StaticProcessor {
    pub static_url: String,
}

impl ContextProcessor for StaticProcessor {
    fn process(&self, _request: &Request) -> HashMap<String, Value> {
        single("STATIC_URL", Value::from(self.static_url.clone()))
    }
}

/// Adds `MEDIA_URL`.
pub struct MediaProcessor {
    pub media_url: String,
}

impl ContextProcessor for MediaProcessor {
    fn process(&self, _request: &Request) -> HashMap<String, Value> {
        single("MEDIA_URL", Value::from(self.media_url.clone()))
    }
}

/// Adds `LANGUAGE_CODE` and `LANGUAGE_BIDI`.
pub struct I18nProcessor {
    pub language_code: String,
}

impl ContextProcessor for I18nProcessor {
    fn process(&self, _request: &Request) -> HashMap<String, Value> {
        let base = self.language_code.split('-').next().unwrap_or_default();
        let bidi = matches!(base, "ar" | "fa" | "he" | "ur");
        let mut ctx = single("LANGUAGE_CODE", Value::from(self.language_code.clone()));
        ctx.insert("LANGUAGE_BIDI".to_string(), Value::from(bidi));
        ctx
    }
}

/// Adds `TIME_ZONE`.
pub struct TzProcessor {
    pub time_zone: String,
}

impl ContextProcessor for TzProcessor {
    fn process(&self, _request: &Request) -> HashMap<String, Value> {
        single("TIME_ZONE", Value::from(self.time_zone.clone()))
    }
}

/// Adds `csrf_token`, `NOTPROVIDED` when the request carries none.
pub struct CsrfProcessor;

impl ContextProcessor for CsrfProcessor {
    fn process(&self, request: &Request) -> HashMap<String, Value> {
        let token = request.csrf_token().unwrap_or("NOTPROVIDED");
        single("csrf_token", Value::from(token))
    }
}

// The hidden form input for a request's CSRF token, empty when there is none.
pub(crate) fn csrf_input(request: &Request) -> SafeString {
    match request.csrf_token() {
        Some(token) if token != "NOTPROVIDED" => SafeString::new(format!(
            "<input type='hidden' name='csrfmiddlewaretoken' value='{}' />",
            crate::utils::escape_html(token)
        )),
        _ => SafeString::default(),
    }
}
