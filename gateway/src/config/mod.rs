//! Configuration management
//!
//! The gateway reads one TOML file at startup, overlays the classic
//! environment variables once, validates the result and injects it into every
//! component. Nothing reads the process environment per request.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where the upstream bearer token comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// Forward the caller's own `Authorization: Bearer` header
    #[default]
    Passthrough,
    /// Use a configured access token
    Static,
    /// Exchange a stored refresh token for a fresh access token per request
    Refresh,
}

impl CredentialMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialMode::Passthrough => "passthrough",
            CredentialMode::Static => "static",
            CredentialMode::Refresh => "refresh",
        }
    }
}

impl std::str::FromStr for CredentialMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(CredentialMode::Passthrough),
            "static" => Ok(CredentialMode::Static),
            "refresh" => Ok(CredentialMode::Refresh),
            other => Err(ConfigError::Invalid(format!("Unknown credential mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub listen: SocketAddr,
    /// Public base URL, used to build the OAuth redirect URI
    pub base_url: String,
    pub cors: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_url: "http://localhost:8080".to_string(),
            cors: false,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoogleSection {
    pub client_id: String,
    pub client_secret: String,
    pub sheets_base_url: String,
    pub token_url: String,
    pub auth_url: String,
}

impl Default for GoogleSection {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
        }
    }
}

impl fmt::Debug for GoogleSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSection")
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("sheets_base_url", &self.sheets_base_url)
            .field("token_url", &self.token_url)
            .field("auth_url", &self.auth_url)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsSection {
    pub mode: CredentialMode,
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for CredentialsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsSection")
            .field("mode", &self.mode)
            .field("access_token", &redacted(&self.access_token))
            .field("refresh_token", &redacted(&self.refresh_token))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSection {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Retry a GET once when the transport fails
    pub retry_reads: bool,
    pub retry_backoff_ms: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retry_reads: true,
            retry_backoff_ms: 250,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsSection {
    /// Directory for the encrypted token store; `None` keeps tokens in memory
    pub dir: Option<PathBuf>,
    /// Passphrase the store key is derived from
    pub key: String,
}

impl fmt::Debug for SecretsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsSection")
            .field("dir", &self.dir)
            .field("key", &redacted(&self.key))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureSection {
    /// Enable `POST /proxy`, the generic Sheets forwarder
    pub raw_endpoint: bool,
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub server: ServerSection,
    pub google: GoogleSection,
    pub credentials: CredentialsSection,
    pub upstream: UpstreamSection,
    pub secrets: SecretsSection,
    pub gateway: FeatureSection,
}

impl GatewayConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read the config file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!("Loaded config from {:?}", path);
                Self::from_toml(&content)
            }
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load, overlay the process environment and validate.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto the file values.
    ///
    /// `lookup` is injected so tests never touch the real environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GOOGLE_CLIENT_ID") {
            self.google.client_id = v;
        }
        if let Some(v) = get("GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = v;
        }
        if let Some(v) = get("GOOGLE_OAUTH_TOKEN") {
            self.credentials.access_token = v;
        }
        if let Some(v) = get("GOOGLE_REFRESH_TOKEN") {
            self.credentials.refresh_token = v;
        }
        if let Some(v) = get("SHEETGATE_CREDENTIAL_MODE") {
            self.credentials.mode = v.parse()?;
        }
        if let Some(v) = get("BASE_URL") {
            self.server.base_url = v;
        }
        if let Some(v) = get("SHEETGATE_SECRET_KEY") {
            self.secrets.key = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("server.base_url", &self.server.base_url),
            ("google.sheets_base_url", &self.google.sheets_base_url),
            ("google.token_url", &self.google.token_url),
            ("google.auth_url", &self.google.auth_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{} is not a valid URL: {}", name, e)))?;
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_secs must be positive".into()));
        }

        match self.credentials.mode {
            CredentialMode::Passthrough => {}
            CredentialMode::Static => {
                if self.credentials.access_token.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "static credential mode requires credentials.access_token".into(),
                    ));
                }
            }
            CredentialMode::Refresh => {
                if self.google.client_id.is_empty() || self.google.client_secret.is_empty() {
                    return Err(ConfigError::Invalid(
                        "refresh credential mode requires google.client_id and google.client_secret"
                            .into(),
                    ));
                }
            }
        }

        let has_dir = self
            .secrets
            .dir
            .as_ref()
            .is_some_and(|d| !d.as_os_str().is_empty());
        if has_dir && self.secrets.key.is_empty() {
            return Err(ConfigError::Invalid(
                "secrets.dir is set but secrets.key is empty".into(),
            ));
        }

        Ok(())
    }

    /// Redirect URI registered for the consent flow.
    pub fn redirect_uri(&self) -> String {
        format!("{}/api/auth/callback", self.server.base_url.trim_end_matches('/'))
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "[REDACTED]"
    }
}
