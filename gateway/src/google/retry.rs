//! Read retry
//!
//! Wraps an [`Upstream`] and retries a GET once after a short pause when the
//! transport fails. Writes are never retried and neither are completed
//! exchanges, whatever their status.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use super::client::Upstream;
use super::types::{UpstreamRequest, UpstreamResponse};
use crate::common::TransportError;

pub struct RetryReads<U> {
    inner: U,
    backoff: Duration,
}

impl<U> RetryReads<U> {
    pub fn new(inner: U, backoff: Duration) -> Self {
        Self { inner, backoff }
    }
}

#[async_trait]
impl<U: Upstream> Upstream for RetryReads<U> {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        if request.method != http::Method::GET {
            return self.inner.send(request).await;
        }

        match self.inner.send(request.clone()).await {
            Ok(response) => Ok(response),
            Err(err) => {
                info!(url = %request.url, "Retrying read after transport failure: {}", err);
                tokio::time::sleep(self.backoff).await;
                self.inner.send(request).await
            }
        }
    }
}
