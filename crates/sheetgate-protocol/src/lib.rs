//! Wire types shared between the gateway and its callers.

pub mod codes;
pub mod envelope;

pub use codes::ErrorCode;
pub use envelope::{ErrorEnvelope, ErrorSource};
