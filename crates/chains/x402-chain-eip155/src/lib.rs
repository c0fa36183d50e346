//! EIP-155 (EVM) payment construction for x402 buyers.
//!
//! Implements the `exact` scheme on EVM chains: the buyer signs an ERC-3009
//! `transferWithAuthorization` with EIP-712, and the seller's facilitator submits it.
//! No transaction is sent and no RPC endpoint is needed on the buyer side.
//!
//! # Modules
//!
//! - [`chain`] - Numeric chain references and checksummed addresses
//! - [`exact`] - The `exact` scheme: wire types and, with `client`, the payload builder
//!
//! # Feature Flags
//!
//! - `client` - Payload signing through Alloy signers (default)
//! - `telemetry` - Tracing spans around payload construction

pub mod chain;
pub mod exact;

pub use exact::Eip155Exact;
#[cfg(feature = "client")]
pub use exact::client::{Eip155ExactClient, SignerLike};
