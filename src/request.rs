use std::collections::BTreeMap;

use http::Method;
use serde::{Serialize, Serializer};

/// The parts of an incoming HTTP request that templates and context
/// processors look at.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Request {
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    pub path: String,
    pub is_secure: bool,
    #[serde(rename = "GET")]
    pub query: BTreeMap<String, String>,
    #[serde(rename = "META")]
    pub meta: BTreeMap<String, String>,
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            is_secure: false,
            query: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// The CSRF token the middleware stored for this request, if any.
    pub fn csrf_token(&self) -> Option<&str> {
        self.meta.get("CSRF_COOKIE").map(String::as_str)
    }
}
