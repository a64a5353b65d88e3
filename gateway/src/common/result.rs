//! Common Result Type

use super::error::GatewayError;

/// Gateway result type
///
/// Converted to an envelope only at the HTTP boundary.
pub type GatewayResult<T> = Result<T, GatewayError>;
