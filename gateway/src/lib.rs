//! sheetgate: a Google Sheets and OAuth2 relay gateway.
//!
//! Callers hit small action-oriented routes (`/values/get`,
//! `/spreadsheets/batchUpdate`, ...). The gateway resolves the action,
//! validates it, translates it to the matching Sheets v4 REST call, attaches
//! credentials and relays the answer. Failures come back as one JSON
//! envelope shape regardless of where they happened.

pub mod auth;
pub mod common;
pub mod config;
pub mod google;
pub mod proxy;
pub mod router;

pub use common::{GatewayError, GatewayResult};
pub use config::GatewayConfig;
pub use proxy::{build_router, AppState, GatewayServer};
