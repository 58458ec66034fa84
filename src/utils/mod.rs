//! Utility modules for common functionality.
//!
//! - constants: Default paths and limits
//! - address: Address validation and bytecode needle helpers
//! - http: Retryable HTTP client construction
//! - logging: Logging utilities
//! - tests: Builders shared by unit and integration tests

pub mod address;
pub mod constants;
pub mod http;
pub mod logging;
pub mod tests;

pub use address::*;
pub use constants::*;
