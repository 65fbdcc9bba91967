//! Shared domain types for the gateway.

pub mod error;
pub mod source;

pub use error::{GatewayError, Result};
pub use source::CallSource;
