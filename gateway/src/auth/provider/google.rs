//! Google OAuth2 Provider
//!
//! Authorization Code flow with offline access against the configured Google
//! endpoints. Token calls go through the shared [`Upstream`] so timeouts and
//! transport classification match the Sheets calls.

use std::sync::Arc;
use tracing::{debug, info};

use super::{OAuthProvider, OAuthTokens};
use crate::common::{GatewayError, GatewayResult};
use crate::config::GoogleSection;
use crate::google::{google_error, Upstream, UpstreamRequest};

/// Scopes requested by the consent flow.
pub const SHEETS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.file",
];

/// Google OAuth2 provider.
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    upstream: Arc<dyn Upstream>,
}

impl GoogleProvider {
    pub fn new(google: &GoogleSection, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            client_id: google.client_id.clone(),
            client_secret: google.client_secret.clone(),
            auth_url: google.auth_url.clone(),
            token_url: google.token_url.clone(),
            upstream,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }

    /// POST a form to the token endpoint and parse the reply.
    async fn post_form(&self, params: &[(&str, &str)]) -> GatewayResult<OAuthTokens> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        let request = UpstreamRequest::new(http::Method::POST, &self.token_url)
            .header("accept", "application/json")
            .form(body);

        let response = self.upstream.send(request).await?;
        if !response.is_success() {
            return Err(GatewayError::Google(google_error(
                response.status,
                &response.body,
            )));
        }

        parse_token_response(&response.body)
    }
}

impl OAuthProvider for GoogleProvider {
    fn authorize_url(&self, scopes: &[&str], redirect_uri: &str) -> GatewayResult<String> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured(
                "google.client_id is not set".to_string(),
            ));
        }

        let mut url = url::Url::parse(&self.auth_url)
            .map_err(|e| GatewayError::Internal(format!("Invalid auth URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", self.client_id.as_str())
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> GatewayResult<OAuthTokens> {
        info!("Exchanging authorization code for tokens");
        self.post_form(&[
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<OAuthTokens> {
        debug!("Refreshing access token");
        self.post_form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }
}

/// Parse a Google OAuth2 token response.
fn parse_token_response(body: &[u8]) -> GatewayResult<OAuthTokens> {
    let parsed: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        GatewayError::Internal(format!("Invalid JSON from token endpoint: {}", e))
    })?;

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::Internal("Missing access_token in response".to_string()))?
        .to_string();

    let refresh_token = parsed
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .map(String::from);

    let token_type = parsed
        .get("token_type")
        .and_then(|v| v.as_str())
        .unwrap_or("Bearer")
        .to_string();

    let expires_in = parsed
        .get("expires_in")
        .and_then(|v| v.as_u64())
        .unwrap_or(3600);

    let expiry = (chrono::Utc::now() + chrono::Duration::seconds(expires_in as i64)).to_rfc3339();

    let scopes = parsed
        .get("scope")
        .and_then(|v| v.as_str())
        .map(|s| s.split(' ').map(String::from).collect())
        .unwrap_or_default();

    Ok(OAuthTokens {
        access_token,
        refresh_token,
        token_type,
        expiry,
        scopes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TransportError;
    use crate::google::{UpstreamBody, UpstreamResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct TokenEndpoint {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<UpstreamRequest>>,
    }

    #[async_trait]
    impl Upstream for TokenEndpoint {
        async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(UpstreamResponse::new(self.status, self.body))
        }
    }

    fn provider(status: u16, body: &'static str) -> (GoogleProvider, Arc<TokenEndpoint>) {
        let endpoint = Arc::new(TokenEndpoint {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        });
        let google = GoogleSection {
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            ..GoogleSection::default()
        };
        (GoogleProvider::new(&google, endpoint.clone()), endpoint)
    }

    #[test]
    fn test_parse_token_response_success() {
        let body = br#"{
            "access_token": "ya29.test",
            "refresh_token": "1//0e.test",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "https://www.googleapis.com/auth/spreadsheets"
        }"#;

        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.access_token, "ya29.test");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//0e.test"));
        assert_eq!(tokens.scopes.len(), 1);
    }

    #[test]
    fn test_parse_token_response_missing_access_token() {
        assert!(parse_token_response(br#"{"token_type":"Bearer"}"#).is_err());
    }

    #[test]
    fn test_authorize_url() {
        let (provider, _) = provider(200, "{}");
        let url = provider
            .authorize_url(SHEETS_SCOPES, "https://gate.example.com/api/auth/callback")
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());

        assert_eq!(get("client_id"), Some("cid"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("access_type"), Some("offline"));
        assert_eq!(get("prompt"), Some("consent"));
        assert_eq!(
            get("redirect_uri"),
            Some("https://gate.example.com/api/auth/callback")
        );
        assert!(get("scope").unwrap().contains("auth/drive.file"));
    }

    #[test]
    fn test_authorize_url_requires_client_id() {
        let provider = GoogleProvider::new(
            &GoogleSection::default(),
            Arc::new(TokenEndpoint {
                status: 200,
                body: "{}",
                seen: Mutex::new(Vec::new()),
            }),
        );
        let err = provider.authorize_url(SHEETS_SCOPES, "http://x").unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_refresh_posts_form() {
        let (provider, endpoint) = provider(200, r#"{"access_token":"ya29.fresh","expires_in":10}"#);
        let tokens = provider.refresh_token("1//rt").await.unwrap();
        assert_eq!(tokens.access_token, "ya29.fresh");

        let seen = endpoint.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, http::Method::POST);
        match &seen[0].body {
            Some(UpstreamBody::Form(form)) => {
                let form = std::str::from_utf8(form).unwrap();
                assert!(form.contains("grant_type=refresh_token"));
                assert!(form.contains("refresh_token=1%2F%2Frt"));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_rejection_is_google_error() {
        let (provider, _) = provider(
            400,
            r#"{"error":"invalid_grant","error_description":"Bad Request"}"#,
        );
        let err = provider.refresh_token("1//rt").await.unwrap_err();
        let env = err.to_envelope();
        assert_eq!(env.status, 400);
        assert_eq!(env.code, "invalid_grant");
        assert_eq!(env.message, "Bad Request");
    }
}
