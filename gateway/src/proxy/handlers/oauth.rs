//! OAuth relay handlers
//!
//! `/oauth/auth` and `/oauth/token` stand in for Google's endpoints so a
//! client configured against the gateway can run a standard OAuth flow.
//! Both relay Google's answer as-is; only transport failures become
//! envelopes.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{header, HeaderMap, Method, Uri};
use std::sync::Arc;
use tracing::{debug, info};

use super::common::{relay, with_content_type};
use crate::common::GatewayError;
use crate::google::UpstreamRequest;
use crate::proxy::protocol::IncomingRequest;
use crate::proxy::AppState;

/// `GET /oauth/auth`: forward the query string to the authorization
/// endpoint without following redirects.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET {
        return GatewayError::method_not_allowed(&method, "oauth.auth").into_response();
    }

    let target = match uri.query() {
        Some(q) if !q.is_empty() => format!("{}?{}", state.config.google.auth_url, q),
        _ => state.config.google.auth_url.clone(),
    };

    debug!("Relaying authorization request");
    match state.upstream.send(UpstreamRequest::new(Method::GET, target)).await {
        Ok(response) => relay(
            response.status,
            &response.headers,
            &[header::LOCATION, header::CONTENT_TYPE],
            response.body,
        ),
        Err(err) => GatewayError::from(err).into_response(),
    }
}

/// `GET|POST /oauth/token`: always POST the form to the token endpoint.
///
/// A GET's query string becomes the form body; a POST body is forwarded
/// verbatim. The caller's `Authorization` (client Basic auth) is kept.
pub async fn token(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = IncomingRequest::new(method, &uri, headers, body);

    let form = match req.method {
        Method::GET => Bytes::from(req.raw_query.clone().unwrap_or_default()),
        Method::POST => req.body.clone(),
        _ => {
            return GatewayError::method_not_allowed(&req.method, "oauth.token").into_response();
        }
    };

    let mut upstream = UpstreamRequest::new(Method::POST, &state.config.google.token_url)
        .header("accept", "application/json")
        .form(form);
    if let Some(auth) = req.header("authorization") {
        upstream = upstream.authorization(auth);
    }

    info!("Relaying token request");
    match state.upstream.send(upstream).await {
        Ok(response) => with_content_type(
            relay(response.status, &response.headers, &[], response.body),
            "application/json",
        ),
        Err(err) => GatewayError::from(err).into_response(),
    }
}
