//! Sheets Router
//!
//! Gateway Dispatcher: credential gate, action resolution, translation, the
//! single upstream call, normalization.

pub mod action;
pub mod dispatcher;
pub mod forward;
pub mod resolve;
pub mod translate;

use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::CredentialSource;
use crate::common::GatewayResult;
use crate::config::GatewayConfig;
use crate::google::{normalize, Relayed, Upstream};
use crate::proxy::protocol::IncomingRequest;

pub use action::{Action, ActionSpec, Family};
pub use dispatcher::SheetsRouter;
pub use resolve::ResolvedAction;

impl SheetsRouter {
    pub fn new(
        config: &GatewayConfig,
        credentials: Arc<CredentialSource>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            credentials,
            upstream,
            sheets_base_url: config.google.sheets_base_url.trim_end_matches('/').to_string(),
            raw_endpoint: config.gateway.raw_endpoint,
        }
    }

    /// Handle one request for a route family.
    ///
    /// Every local rejection happens before the credential strategy or the
    /// upstream is touched.
    pub async fn handle(&self, family: Family, req: &IncomingRequest) -> GatewayResult<Relayed> {
        let caller = self.credentials.check_caller(&req.headers)?;
        let action = resolve::resolve(family, req)?;
        let qualified = action.spec().qualified();

        let authorization = self.credentials.authorization(caller).await?;
        let upstream_request =
            (action.spec().build)(&action, &self.sheets_base_url).authorization(authorization);

        info!(action = %qualified, method = %upstream_request.method, "Dispatching to Google");
        let response = self.upstream.send(upstream_request).await?;
        debug!(action = %qualified, status = response.status, "Google responded");

        normalize(response)
    }
}
