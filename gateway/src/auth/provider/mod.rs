//! OAuth Provider Abstraction

pub mod google;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::GatewayResult;

/// Tokens returned from an OAuth token exchange or refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expiry: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// OAuth provider trait.
///
/// Authorization URL construction, code exchange and refresh. Upstream
/// rejections come back as `GatewayError::Google` so they are normalized like
/// any other Google error.
#[allow(async_fn_in_trait)]
pub trait OAuthProvider {
    /// Build the consent-screen URL.
    fn authorize_url(&self, scopes: &[&str], redirect_uri: &str) -> GatewayResult<String>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> GatewayResult<OAuthTokens>;

    /// Obtain a fresh access token.
    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<OAuthTokens>;
}
