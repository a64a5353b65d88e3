//! Common Handler Utilities
//!
//! Response construction shared by the route handlers.

use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::common::GatewayResult;
use crate::google::Relayed;

/// Render a dispatcher result: relayed success or error envelope.
pub fn respond(result: GatewayResult<Relayed>) -> Response {
    match result {
        Ok(relayed) => relayed.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Relay an upstream status and body, copying only the named headers.
pub fn relay(status: u16, upstream_headers: &HeaderMap, copy: &[header::HeaderName], body: Bytes) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.remove(header::CONTENT_TYPE);
    for name in copy {
        if let Some(value) = upstream_headers.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    response
}

/// Force a content type on an already-built response.
pub fn with_content_type(mut response: Response, content_type: &'static str) -> Response {
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_copies_only_named_headers() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::LOCATION, HeaderValue::from_static("https://accounts.example/x"));
        upstream.insert(header::SET_COOKIE, HeaderValue::from_static("a=b"));

        let response = relay(302, &upstream, &[header::LOCATION, header::CONTENT_TYPE], Bytes::new());
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers().get(header::LOCATION).is_some());
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
