//! HTTP Gateway
//!
//! axum surface for the Sheets routes, the OAuth relay and the consent flow.
//! Every route is served at the root and again under `/api`.

pub mod handlers;
pub mod protocol;
pub mod server;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::provider::google::GoogleProvider;
use crate::auth::store::{EncryptedFileStore, MemoryStore, SecretStore};
use crate::auth::CredentialSource;
use crate::common::{GatewayError, GatewayResult};
use crate::config::{GatewayConfig, SecretsSection};
use crate::google::{GoogleClient, RetryReads, Upstream};
use crate::router::SheetsRouter;

pub use protocol::IncomingRequest;
pub use server::{build_router, GatewayServer};

/// State shared by every handler
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub sheets: SheetsRouter,
    pub oauth: Arc<GoogleProvider>,
    pub store: Arc<dyn SecretStore>,
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    /// Production wiring: reqwest transport, optional read retry, configured
    /// secret store.
    pub fn new(config: GatewayConfig) -> GatewayResult<Arc<Self>> {
        let client = GoogleClient::new(&config.upstream)?;
        let upstream: Arc<dyn Upstream> = if config.upstream.retry_reads {
            Arc::new(RetryReads::new(
                client,
                Duration::from_millis(config.upstream.retry_backoff_ms),
            ))
        } else {
            Arc::new(client)
        };
        let store = open_store(&config.secrets)?;
        Ok(Self::with_upstream(config, upstream, store))
    }

    /// Wire the gateway around a given transport and store.
    pub fn with_upstream(
        config: GatewayConfig,
        upstream: Arc<dyn Upstream>,
        store: Arc<dyn SecretStore>,
    ) -> Arc<Self> {
        let oauth = Arc::new(GoogleProvider::new(&config.google, upstream.clone()));
        let credentials = Arc::new(CredentialSource::new(
            &config.credentials,
            oauth.clone(),
            store.clone(),
        ));
        let sheets = SheetsRouter::new(&config, credentials, upstream.clone());

        Arc::new(Self {
            config: Arc::new(config),
            sheets,
            oauth,
            store,
            upstream,
        })
    }
}

fn open_store(secrets: &SecretsSection) -> GatewayResult<Arc<dyn SecretStore>> {
    match &secrets.dir {
        Some(dir) if !dir.as_os_str().is_empty() => {
            let store = EncryptedFileStore::open(dir, &secrets.key)
                .map_err(|e| GatewayError::NotConfigured(format!("Secret store: {}", e)))?;
            Ok(Arc::new(store))
        }
        _ => {
            info!("No secrets.dir configured; tokens from the consent flow are kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
