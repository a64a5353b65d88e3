//! HTTP boundary types
//!
//! [`IncomingRequest`] is the host-independent view of an inbound call that
//! the routers work on. This module also renders gateway results back into
//! HTTP responses: successes relay the upstream body, failures become the
//! error envelope.

use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::common::{GatewayError, GatewayResult};
use crate::google::Relayed;

/// An inbound request, captured once per call.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`
    pub raw_query: Option<String>,
    /// Decoded query pairs, repeated keys kept in order
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IncomingRequest {
    pub fn new(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        let raw_query = uri.query().map(str::to_string);
        let query = raw_query
            .as_deref()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            method,
            path: uri.path().to_string(),
            raw_query,
            query,
            headers,
            body,
        }
    }

    /// First value of a query parameter.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Path segments after the route's family segment.
    ///
    /// `/api/spreadsheets/developerMetadata/get` with family `spreadsheets`
    /// gives `["developerMetadata", "get"]`.
    pub fn path_tail(&self, family: &str) -> Vec<&str> {
        let segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.iter().position(|s| *s == family) {
            Some(idx) => segments[idx + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    /// Parse the body as a JSON object.
    ///
    /// Empty bodies are `None`. Unparsable JSON is `BAD_JSON`; valid JSON
    /// that is not an object is `INVALID_PARAMS`.
    pub fn json_object(&self) -> GatewayResult<Option<Map<String, Value>>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        match serde_json::from_slice::<Value>(&self.body)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(GatewayError::invalid_params(
                "Request body must be a JSON object",
            )),
        }
    }
}

// ── Responses ───────────────────────────────────────────────────────────────

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let envelope = self.to_envelope();
        match &self {
            GatewayError::Internal(msg) => error!("Unhandled gateway error: {}", msg),
            GatewayError::Transport(err) => warn!("Transport failure: {}", err),
            _ => {}
        }
        (status_code(envelope.status), Json(envelope)).into_response()
    }
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        match self {
            Relayed::Json { status, body } => (status_code(status), Json(body)).into_response(),
            Relayed::Text {
                status,
                content_type,
                body,
            } => {
                let mut response = (status_code(status), body).into_response();
                if let Ok(value) = HeaderValue::from_str(&content_type) {
                    response
                        .headers_mut()
                        .insert(http::header::CONTENT_TYPE, value);
                }
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, uri: &str, body: &'static str) -> IncomingRequest {
        IncomingRequest::new(
            method,
            &uri.parse().unwrap(),
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[test]
    fn test_query_decoded_and_ordered() {
        let req = request(
            Method::GET,
            "/values?spreadsheetId=S&range=Sheet%201!A1%3AB2&ranges=a&ranges=b",
            "",
        );
        assert_eq!(req.query_value("range"), Some("Sheet 1!A1:B2"));
        let ranges: Vec<&str> = req
            .query
            .iter()
            .filter(|(k, _)| k == "ranges")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(ranges, vec!["a", "b"]);
    }

    #[test]
    fn test_path_tail() {
        let req = request(Method::GET, "/api/spreadsheets/developerMetadata/get", "");
        assert_eq!(req.path_tail("spreadsheets"), vec!["developerMetadata", "get"]);
        let req = request(Method::GET, "/values", "");
        assert!(req.path_tail("values").is_empty());
    }

    #[test]
    fn test_empty_body_is_none() {
        assert!(request(Method::POST, "/values", "  \n").json_object().unwrap().is_none());
    }

    #[test]
    fn test_bad_json() {
        let err = request(Method::POST, "/values", "{not json").json_object().unwrap_err();
        assert!(matches!(err, GatewayError::BadJson(_)));
    }

    #[test]
    fn test_non_object_body() {
        let err = request(Method::POST, "/values", "[1,2]").json_object().unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }

    #[test]
    fn test_error_response_status() {
        let response = GatewayError::MissingAuth.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
