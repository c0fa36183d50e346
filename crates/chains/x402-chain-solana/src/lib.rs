#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana payment construction for x402 buyers.
//!
//! Implements the `exact` scheme on Solana: the buyer builds a versioned transaction
//! that performs one SPL `TransferChecked` (classic SPL Token or Token-2022), signs it
//! as token owner, and hands it to the seller, whose fee payer co-signs and submits it.
//!
//! # Modules
//!
//! - [`chain`] - Default RPC endpoints, public key parsing and, with `client`, RPC access
//! - [`exact`] - The `exact` scheme: wire types, transaction layout and the builder
//!
//! # Feature Flags
//!
//! - `client` - Transaction construction and signing (default)
//! - `telemetry` - Tracing spans around payload construction

pub mod chain;
pub mod exact;

pub use exact::SolanaExact;
#[cfg(feature = "client")]
pub use exact::client::SolanaExactClient;
