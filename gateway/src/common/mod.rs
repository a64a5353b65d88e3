//! Common Utilities
//!
//! Shared error types, the result alias and HTTP client construction.

pub mod error;
pub mod http;
pub mod result;

pub use error::{GatewayError, TransportError};
pub use http::create_http_client;
pub use result::GatewayResult;
