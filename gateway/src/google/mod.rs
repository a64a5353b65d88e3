//! Google API Client Module
//!
//! Upstream transport to the Sheets and OAuth endpoints, the read-retry
//! wrapper, and normalization of whatever comes back.

pub mod client;
pub mod normalize;
pub mod retry;
pub mod types;

pub use client::{GoogleClient, Upstream};
pub use normalize::{google_error, normalize, Relayed};
pub use retry::RetryReads;
pub use types::{UpstreamBody, UpstreamRequest, UpstreamResponse};
