//! HTTP Client Utilities
//!
//! Shared reqwest client creation with the configured upstream limits.

use std::time::Duration;

use crate::config::UpstreamSection;

use super::error::GatewayError;

/// Create the reqwest client used for every upstream call
///
/// - request and connect timeouts from config
/// - redirects are never followed (the OAuth relay forwards `Location` itself)
pub fn create_http_client(upstream: &UpstreamSection) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(upstream.timeout_secs))
        .connect_timeout(Duration::from_secs(upstream.connect_timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("sheetgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(create_http_client(&UpstreamSection::default()).is_ok());
    }
}
