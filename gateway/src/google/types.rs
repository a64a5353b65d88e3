//! Upstream request/response values
//!
//! Plain data passed between the translator, the transport and the
//! normalizer. Nothing here performs I/O.

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde_json::Value;

/// Body of an outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    /// Serialized as `application/json`
    Json(Value),
    /// Pre-encoded `application/x-www-form-urlencoded` payload, sent verbatim
    Form(Bytes),
}

impl UpstreamBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            UpstreamBody::Json(_) => "application/json",
            UpstreamBody::Form(_) => "application/x-www-form-urlencoded",
        }
    }
}

/// A fully built outbound call. The URL is final: path segments and query
/// values are already percent-encoded exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<UpstreamBody>,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(UpstreamBody::Json(body));
        self
    }

    pub fn form(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(UpstreamBody::Form(body.into()));
        self
    }

    /// Set the `Authorization` header, replacing any earlier value.
    pub fn authorization(mut self, value: impl Into<String>) -> Self {
        self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        self.headers.push(("authorization", value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back from a completed exchange, before normalization.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Convenience for stubs: a JSON body with the matching content type.
    pub fn json(status: u16, body: &Value) -> Self {
        let mut response = Self::new(status, body.to_string());
        response.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json; charset=UTF-8"),
        );
        response
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
