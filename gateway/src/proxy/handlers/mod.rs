//! Route handlers
//!
//! Thin axum adapters: capture the request, hand it to the router, render
//! the result. Every handler accepts any method and applies its own method
//! rules so rejections use the error envelope.

pub mod auth;
pub mod common;
pub mod oauth;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde_json::{json, Value};
use std::sync::Arc;

use self::common::respond;
use super::protocol::IncomingRequest;
use super::AppState;
use crate::router::Family;

/// `/values`, `/values/*`
pub async fn values(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = IncomingRequest::new(method, &uri, headers, body);
    respond(state.sheets.handle(Family::Values, &req).await)
}

/// `/spreadsheets`, `/spreadsheets/*`
pub async fn spreadsheets(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = IncomingRequest::new(method, &uri, headers, body);
    respond(state.sheets.handle(Family::Spreadsheets, &req).await)
}

/// `/proxy`
pub async fn forward(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = IncomingRequest::new(method, &uri, headers, body);
    respond(state.sheets.forward(&req).await)
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
