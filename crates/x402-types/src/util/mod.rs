//! Utility types and functions for x402.
//!
//! - [`b64`] - Base64 encoding/decoding utilities
//! - [`lit_str`] - Compile-time string literal types
//! - [`money_amount`] - Human-readable rendering of token amounts
//! - [`backoff`] - Bounded exponential retry for transient failures

pub mod b64;
pub mod backoff;
pub mod lit_str;
pub mod money_amount;

pub use b64::*;
pub use backoff::RetryPolicy;
