//! Sheets Router Dispatcher
//!
//! Main entry point for action-based routing.

use std::sync::Arc;

use crate::auth::CredentialSource;
use crate::google::Upstream;

/// The Sheets router
pub struct SheetsRouter {
    pub(super) credentials: Arc<CredentialSource>,
    pub(super) upstream: Arc<dyn Upstream>,
    pub(super) sheets_base_url: String,
    pub(super) raw_endpoint: bool,
}
