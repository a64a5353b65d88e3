//! Consent flow handlers
//!
//! `/auth/start` sends the operator to Google's consent screen;
//! `/auth/callback` exchanges the returned code and stores the tokens in the
//! secret store so refresh mode can use them.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::{header, Method, StatusCode, Uri};
use sheetgate_protocol::ErrorEnvelope;
use std::sync::Arc;
use tracing::{info, warn};

use super::common::with_content_type;
use crate::auth::provider::google::SHEETS_SCOPES;
use crate::auth::provider::OAuthProvider;
use crate::auth::{TokenRecord, DEFAULT_ACCOUNT, DEFAULT_PROVIDER};
use crate::common::GatewayError;
use crate::proxy::AppState;

/// `GET /auth/start`
pub async fn start(State(state): State<Arc<AppState>>, method: Method) -> Response {
    if method != Method::GET {
        return GatewayError::method_not_allowed(&method, "auth.start").into_response();
    }

    match state
        .oauth
        .authorize_url(SHEETS_SCOPES, &state.config.redirect_uri())
    {
        Ok(url) => {
            info!("Redirecting to Google consent screen");
            (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// `GET /auth/callback?code=…`
pub async fn callback(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return GatewayError::method_not_allowed(&method, "auth.callback").into_response();
    }

    let params: Vec<(String, String)> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let param = |name: &str| {
        params
            .iter()
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.as_str())
    };

    if let Some(error) = param("error") {
        warn!(error, "Consent was not granted");
        let message = param("error_description").unwrap_or("Authorization was not granted");
        return GatewayError::Google(ErrorEnvelope::google(400, error, message)).into_response();
    }

    let Some(code) = param("code") else {
        return GatewayError::missing_params(&["code"]).into_response();
    };

    let tokens = match state
        .oauth
        .exchange_code(code, &state.config.redirect_uri())
        .await
    {
        Ok(tokens) => tokens,
        Err(err) => return err.into_response(),
    };

    if tokens.refresh_token.is_none() {
        warn!("Google did not return a refresh token; refresh mode will not be able to use it");
    }

    let record = TokenRecord::from_tokens(DEFAULT_PROVIDER, DEFAULT_ACCOUNT, &tokens);
    if let Err(e) = state.store.save(&record) {
        return GatewayError::Internal(format!("Failed to store tokens: {}", e)).into_response();
    }

    info!(
        provider = DEFAULT_PROVIDER,
        account = DEFAULT_ACCOUNT,
        "Stored tokens from consent flow"
    );
    with_content_type(
        "Authorization complete. Tokens have been stored securely.".into_response(),
        "text/plain; charset=utf-8",
    )
}
