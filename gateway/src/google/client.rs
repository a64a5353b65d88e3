//! Google API HTTP Client
//!
//! Executes prepared [`UpstreamRequest`]s against Google over reqwest. The
//! client never interprets the response; classification is the normalizer's
//! job. Only transport failures surface as errors here.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{UpstreamBody, UpstreamRequest, UpstreamResponse};
use crate::common::{create_http_client, GatewayResult, TransportError};
use crate::config::UpstreamSection;

/// Something that can complete one upstream exchange.
///
/// The production implementation is [`GoogleClient`]; tests substitute a
/// recording stub.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

#[async_trait]
impl<U: Upstream + ?Sized> Upstream for std::sync::Arc<U> {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        (**self).send(request).await
    }
}

/// reqwest-backed upstream transport
pub struct GoogleClient {
    client: Client,
    timeout: Duration,
}

impl GoogleClient {
    pub fn new(upstream: &UpstreamSection) -> GatewayResult<Self> {
        Ok(Self {
            client: create_http_client(upstream)?,
            timeout: Duration::from_secs(upstream.timeout_secs),
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Upstream for GoogleClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "Sending upstream request");

        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.header(reqwest::header::CONTENT_TYPE, body.content_type());
            builder = match body {
                UpstreamBody::Json(value) => builder.body(value.to_string()),
                UpstreamBody::Form(form) => builder.body(form.clone()),
            };
        }

        let response = builder.send().await.map_err(|e| {
            let err = self.classify(e);
            warn!(url = %request.url, "Upstream transport failure: {}", err);
            err
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        debug!(status, bytes = body.len(), "Upstream response received");

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
