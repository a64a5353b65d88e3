//! Response normalization
//!
//! Turns a completed upstream exchange into either a relayable success or a
//! `source: "google"` error envelope. Transport failures never reach this
//! module; they are already [`TransportError`](crate::common::TransportError)s.

use serde_json::{Map, Value};
use sheetgate_protocol::ErrorEnvelope;
use tracing::warn;

use super::types::UpstreamResponse;
use crate::common::{GatewayError, GatewayResult};

pub const FALLBACK_CODE: &str = "GOOGLE_ERROR";
pub const FALLBACK_MESSAGE: &str = "Google API error";

/// A successful upstream reply ready to hand back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Relayed {
    Json { status: u16, body: Value },
    /// 2xx body that was not JSON; passed through untouched
    Text {
        status: u16,
        content_type: String,
        body: String,
    },
}

/// Classify an upstream response.
///
/// 2xx keeps its exact status. An empty 2xx body becomes `{}`.
pub fn normalize(response: UpstreamResponse) -> GatewayResult<Relayed> {
    if !response.is_success() {
        let envelope = google_error(response.status, &response.body);
        warn!(
            status = envelope.status,
            code = %envelope.code,
            "Google returned an error"
        );
        return Err(GatewayError::Google(envelope));
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Relayed::Json {
            status: response.status,
            body: Value::Object(Map::new()),
        });
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(body) => Ok(Relayed::Json {
            status: response.status,
            body,
        }),
        Err(_) => Ok(Relayed::Text {
            status: response.status,
            content_type: response
                .content_type()
                .unwrap_or("text/plain; charset=utf-8")
                .to_string(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }),
    }
}

/// Build the envelope for a non-2xx upstream body.
///
/// Handles both the Google API shape
/// `{"error": {"code": 403, "status": "PERMISSION_DENIED", "message": ...}}`
/// and the OAuth shape `{"error": "invalid_grant", "error_description": ...}`.
pub fn google_error(status: u16, body: &[u8]) -> ErrorEnvelope {
    let parsed = match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            let envelope = ErrorEnvelope::google(status, FALLBACK_CODE, FALLBACK_MESSAGE);
            let text = String::from_utf8_lossy(body);
            return if text.trim().is_empty() {
                envelope
            } else {
                envelope.with_details(Value::String(text.into_owned()))
            };
        }
    };

    match parsed.get("error") {
        Some(Value::Object(error)) => {
            let code = match (error.get("status"), error.get("code")) {
                (Some(Value::String(status)), _) if !status.is_empty() => status.clone(),
                (_, Some(Value::Number(n))) => n.to_string(),
                (_, Some(Value::String(c))) if !c.is_empty() => c.clone(),
                _ => FALLBACK_CODE.to_string(),
            };
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(FALLBACK_MESSAGE);
            let envelope = ErrorEnvelope::google(status, code, message);
            match error.get("details").or_else(|| error.get("errors")) {
                Some(details) => envelope.with_details(details.clone()),
                None => envelope,
            }
        }
        Some(Value::String(code)) => {
            let message = parsed
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or(FALLBACK_MESSAGE);
            ErrorEnvelope::google(status, code.as_str(), message)
        }
        _ => ErrorEnvelope::google(status, FALLBACK_CODE, FALLBACK_MESSAGE).with_details(parsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheetgate_protocol::ErrorSource;

    #[test]
    fn test_permission_denied() {
        let res = UpstreamResponse::json(
            403,
            &json!({"error": {"code": 403, "status": "PERMISSION_DENIED", "message": "x"}}),
        );
        let err = normalize(res).unwrap_err();
        let env = err.to_envelope();
        assert!(!env.ok);
        assert_eq!(env.source, ErrorSource::Google);
        assert_eq!(env.status, 403);
        assert_eq!(env.code, "PERMISSION_DENIED");
        assert_eq!(env.message, "x");
        assert!(env.details.is_none());
    }

    #[test]
    fn test_unstructured_error_falls_back() {
        let env = google_error(503, b"<html>Service Unavailable</html>");
        assert_eq!(env.status, 503);
        assert_eq!(env.code, FALLBACK_CODE);
        assert_eq!(env.message, FALLBACK_MESSAGE);
        assert_eq!(env.details, Some(json!("<html>Service Unavailable</html>")));
    }

    #[test]
    fn test_oauth_error_shape() {
        let env = google_error(
            400,
            br#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
        );
        assert_eq!(env.code, "invalid_grant");
        assert_eq!(env.message, "Token has been expired or revoked.");
        assert_eq!(env.source, ErrorSource::Google);
    }

    #[test]
    fn test_error_details_kept() {
        let env = google_error(
            400,
            br#"{"error":{"code":400,"message":"bad range","status":"INVALID_ARGUMENT","details":[{"reason":"r"}]}}"#,
        );
        assert_eq!(env.code, "INVALID_ARGUMENT");
        assert_eq!(env.details, Some(json!([{"reason": "r"}])));
    }

    #[test]
    fn test_error_without_status_uses_numeric_code() {
        let env = google_error(404, br#"{"error":{"code":404,"message":"Requested entity was not found."}}"#);
        assert_eq!(env.code, "404");
        assert_eq!(env.status, 404);
        assert_eq!(env.message, "Requested entity was not found.");
    }

    #[test]
    fn test_error_without_status_or_code_uses_fallback_code() {
        let env = google_error(500, br#"{"error":{"message":"Internal error"}}"#);
        assert_eq!(env.code, FALLBACK_CODE);
        assert_eq!(env.message, "Internal error");
    }

    #[test]
    fn test_success_status_preserved() {
        let res = UpstreamResponse::json(201, &json!({"spreadsheetId": "S"}));
        let relayed = normalize(res).unwrap();
        assert_eq!(
            relayed,
            Relayed::Json {
                status: 201,
                body: json!({"spreadsheetId": "S"})
            }
        );
    }

    #[test]
    fn test_empty_success_is_empty_object() {
        let relayed = normalize(UpstreamResponse::new(204, "")).unwrap();
        assert_eq!(
            relayed,
            Relayed::Json {
                status: 204,
                body: json!({})
            }
        );
    }

    #[test]
    fn test_non_json_success_relayed_as_text() {
        let relayed = normalize(UpstreamResponse::new(200, "plain")).unwrap();
        match relayed {
            Relayed::Text { status, body, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body, "plain");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
