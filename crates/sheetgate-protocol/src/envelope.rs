//! Normalized error envelope
//!
//! `{ok:false, source, status, code, message, details?}`. Success responses
//! are never wrapped; the upstream JSON is relayed as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codes::ErrorCode;

/// Where an error originated.
///
/// `Proxy` covers local validation and transport failures; `Google` covers
/// errors returned by a completed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    Proxy,
    Google,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always `false`
    pub ok: bool,

    pub source: ErrorSource,

    /// HTTP status sent to the caller
    pub status: u16,

    /// One of [`ErrorCode`] for local failures, Google's status string otherwise
    pub code: String,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    /// Envelope for a failure detected by the gateway itself.
    pub fn proxy(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::proxy_with_status(code, code.default_status(), message)
    }

    /// Local failure with an explicit status (e.g. 504 for an upstream timeout).
    pub fn proxy_with_status(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            source: ErrorSource::Proxy,
            status,
            code: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Envelope for an error returned by Google, preserving its status.
    pub fn google(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            source: ErrorSource::Google,
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_code(&self, code: ErrorCode) -> bool {
        self.code == code.as_str()
    }
}
