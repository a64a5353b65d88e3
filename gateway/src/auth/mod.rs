//! Credentials
//!
//! Decides which bearer token an upstream call carries. Three strategies,
//! chosen once by configuration:
//!
//! - passthrough: the caller's own `Authorization: Bearer` header
//! - static: a configured access token
//! - refresh: a fresh access token obtained per request from a stored
//!   refresh token
//!
//! Tokens obtained through the consent flow are persisted in a
//! [`SecretStore`]; they are never logged.

pub mod crypto;
pub mod provider;
pub mod store;

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use self::provider::google::GoogleProvider;
use self::provider::{OAuthProvider, OAuthTokens};
use self::store::SecretStore;
use crate::common::{GatewayError, GatewayResult};
use crate::config::{CredentialMode, CredentialsSection};

/// Provider/account pair the consent flow stores its tokens under.
pub const DEFAULT_PROVIDER: &str = "google";
pub const DEFAULT_ACCOUNT: &str = "default";

// ── Public types ────────────────────────────────────────────────────────────

/// Stored token record (decrypted form)
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TokenRecord {
    #[zeroize(skip)]
    pub provider: String,
    #[zeroize(skip)]
    pub account: String,
    #[zeroize(skip)]
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    #[zeroize(skip)]
    pub expiry: String,
    #[zeroize(skip)]
    pub scopes: Vec<String>,
    #[serde(default)]
    #[zeroize(skip)]
    pub issued_at: String,
}

impl TokenRecord {
    pub fn new(
        provider: impl Into<String>,
        account: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            account: account.into(),
            token_type: "Bearer".to_string(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expiry: String::new(),
            scopes: Vec::new(),
            issued_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Build a record from a code exchange.
    pub fn from_tokens(provider: &str, account: &str, tokens: &OAuthTokens) -> Self {
        Self {
            provider: provider.to_string(),
            account: account.to_string(),
            token_type: tokens.token_type.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone().unwrap_or_default(),
            expiry: tokens.expiry.clone(),
            scopes: tokens.scopes.clone(),
            issued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// Custom Debug implementation that redacts sensitive fields
impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("provider", &self.provider)
            .field("account", &self.account)
            .field("token_type", &self.token_type)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

// ── Credential source ───────────────────────────────────────────────────────

/// The configured credential strategy.
pub struct CredentialSource {
    mode: CredentialMode,
    access_token: Zeroizing<String>,
    refresh_token: Zeroizing<String>,
    provider: Arc<GoogleProvider>,
    store: Arc<dyn SecretStore>,
}

impl CredentialSource {
    pub fn new(
        credentials: &CredentialsSection,
        provider: Arc<GoogleProvider>,
        store: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            mode: credentials.mode,
            access_token: Zeroizing::new(credentials.access_token.clone()),
            refresh_token: Zeroizing::new(credentials.refresh_token.clone()),
            provider,
            store,
        }
    }

    /// Gate applied before anything else touches the request.
    ///
    /// In passthrough mode the caller's header must be `Bearer <token>`
    /// (scheme case-insensitive); it is returned verbatim. Other modes ignore
    /// the caller's header.
    pub fn check_caller(&self, headers: &HeaderMap) -> GatewayResult<Option<String>> {
        if self.mode != CredentialMode::Passthrough {
            return Ok(None);
        }

        let header = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::MissingAuth)?;

        if is_bearer(header) {
            Ok(Some(header.to_string()))
        } else {
            Err(GatewayError::MissingAuth)
        }
    }

    /// Produce the `Authorization` header value for an upstream call.
    ///
    /// `caller` is what [`check_caller`](Self::check_caller) returned.
    pub async fn authorization(&self, caller: Option<String>) -> GatewayResult<String> {
        match self.mode {
            CredentialMode::Passthrough => caller.ok_or(GatewayError::MissingAuth),
            CredentialMode::Static => {
                if self.access_token.is_empty() {
                    return Err(GatewayError::NotConfigured(
                        "static credential mode has no access token".to_string(),
                    ));
                }
                Ok(format!("Bearer {}", self.access_token.as_str()))
            }
            CredentialMode::Refresh => {
                let refresh_token = self.refresh_token()?;
                let tokens = self.provider.refresh_token(&refresh_token).await?;
                debug!("Obtained fresh access token");
                Ok(format!("Bearer {}", tokens.access_token))
            }
        }
    }

    /// Configured refresh token first, then the one the consent flow stored.
    fn refresh_token(&self) -> GatewayResult<Zeroizing<String>> {
        if !self.refresh_token.is_empty() {
            return Ok(self.refresh_token.clone());
        }

        match self.store.load(DEFAULT_PROVIDER, DEFAULT_ACCOUNT) {
            Ok(Some(record)) if !record.refresh_token.is_empty() => {
                Ok(Zeroizing::new(record.refresh_token.clone()))
            }
            Ok(_) => {
                warn!("Refresh mode enabled but no refresh token is available");
                Err(GatewayError::MissingAuth)
            }
            Err(e) => Err(GatewayError::Internal(format!(
                "Failed to read secret store: {}",
                e
            ))),
        }
    }
}

fn is_bearer(header: &str) -> bool {
    header.len() > 7 && header.as_bytes()[..7].eq_ignore_ascii_case(b"bearer ")
}
