//! Envelope error codes
//!
//! Every failure the gateway produces locally carries one of these codes.
//! Errors surfaced by Google keep Google's own code string instead, so the
//! `code` field of an envelope is not restricted to this set.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client input errors, detected before any network call
    MissingAuth,
    InvalidParams,
    BadJson,
    MethodNotAllowed,
    UnknownAction,

    // Upstream
    GoogleError,
    FetchError,

    // Gateway side
    NotConfigured,
    Unhandled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingAuth => "MISSING_AUTH",
            ErrorCode::InvalidParams => "INVALID_PARAMS",
            ErrorCode::BadJson => "BAD_JSON",
            ErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ErrorCode::UnknownAction => "UNKNOWN_ACTION",
            ErrorCode::GoogleError => "GOOGLE_ERROR",
            ErrorCode::FetchError => "FETCH_ERROR",
            ErrorCode::NotConfigured => "NOT_CONFIGURED",
            ErrorCode::Unhandled => "UNHANDLED",
        }
    }

    /// HTTP status used when the code is raised without a more specific one.
    ///
    /// `GOOGLE_ERROR` has no fixed status; it mirrors the upstream response and
    /// only falls back to 502 here.
    pub fn default_status(&self) -> u16 {
        match self {
            ErrorCode::MissingAuth => 401,
            ErrorCode::InvalidParams => 400,
            ErrorCode::BadJson => 400,
            ErrorCode::MethodNotAllowed => 405,
            ErrorCode::UnknownAction => 404,
            ErrorCode::GoogleError => 502,
            ErrorCode::FetchError => 502,
            ErrorCode::NotConfigured => 500,
            ErrorCode::Unhandled => 500,
        }
    }

    /// True for the codes that reject a request before it leaves the gateway.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::MissingAuth
                | ErrorCode::InvalidParams
                | ErrorCode::BadJson
                | ErrorCode::MethodNotAllowed
                | ErrorCode::UnknownAction
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
