//! Common Error Types
//!
//! Unified error handling with envelope code mapping. Every failure inside the
//! gateway is a [`GatewayError`]; it only becomes an [`ErrorEnvelope`] at the
//! HTTP boundary.

use std::time::Duration;

use sheetgate_protocol::{ErrorCode, ErrorEnvelope};

/// Failure to complete an exchange with an upstream endpoint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("could not connect to upstream: {0}")]
    Connect(String),

    #[error("upstream request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// 504 for timeouts, 502 for everything else.
    pub fn status(&self) -> u16 {
        match self {
            TransportError::Timeout(_) => 504,
            TransportError::Connect(_) | TransportError::Request(_) => 502,
        }
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Missing or malformed Authorization header")]
    MissingAuth,

    #[error("{0}")]
    InvalidParams(String),

    #[error("Request body is not valid JSON: {0}")]
    BadJson(String),

    #[error("Method {method} not allowed for {action}")]
    MethodNotAllowed { method: String, action: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Error returned by a completed Google call, already normalized.
    #[error("Google API error {}: {}", .0.code, .0.message)]
    Google(ErrorEnvelope),

    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        GatewayError::InvalidParams(message.into())
    }

    /// Create a missing-parameters error naming every absent parameter
    pub fn missing_params(names: &[&str]) -> Self {
        GatewayError::InvalidParams(format!("Missing required parameter(s): {}", names.join(", ")))
    }

    pub fn method_not_allowed(method: &::http::Method, action: impl Into<String>) -> Self {
        GatewayError::MethodNotAllowed {
            method: method.as_str().to_string(),
            action: action.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::MissingAuth => ErrorCode::MissingAuth,
            GatewayError::InvalidParams(_) => ErrorCode::InvalidParams,
            GatewayError::BadJson(_) => ErrorCode::BadJson,
            GatewayError::MethodNotAllowed { .. } => ErrorCode::MethodNotAllowed,
            GatewayError::UnknownAction(_) => ErrorCode::UnknownAction,
            GatewayError::Transport(_) => ErrorCode::FetchError,
            GatewayError::Google(_) => ErrorCode::GoogleError,
            GatewayError::NotConfigured(_) => ErrorCode::NotConfigured,
            GatewayError::Internal(_) => ErrorCode::Unhandled,
        }
    }

    /// Convert to the caller-facing envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            GatewayError::Google(envelope) => envelope.clone(),
            GatewayError::Transport(err) => ErrorEnvelope::proxy_with_status(
                ErrorCode::FetchError,
                err.status(),
                format!("Failed to reach Google: {}", err),
            ),
            GatewayError::MethodNotAllowed { method, action } => {
                ErrorEnvelope::proxy(ErrorCode::MethodNotAllowed, self.to_string()).with_details(
                    serde_json::json!({ "method": method, "action": action }),
                )
            }
            other => ErrorEnvelope::proxy(other.code(), other.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::BadJson(err.to_string())
    }
}
