//! Buyer-side implementation of the [x402 protocol](https://www.x402.org).
//!
//! This crate bundles the buyer workspace and ships the `x402-buyer` binary,
//! which requests one URL and pays for it when the server answers
//! `402 Payment Required`.
//!
//! # Overview
//!
//! A 402 response lists acceptable payment methods (`accepts`). The buyer orders
//! them by preference, builds a signed payment for the first one it can pay, and
//! retries the request with the payment in a header. A rejected payment moves on
//! to the next method. Each payment is sent at most once.
//!
//! # Crates
//!
//! - [`x402_types`] - wire types, error taxonomy, scheme registry and candidate selection.
//! - [`x402_chain_eip155`] - EIP-3009 `transferWithAuthorization` payments on EVM chains.
//! - [`x402_chain_solana`] - SPL `TransferChecked` payments on Solana, co-signed by a fee payer.
//! - [`x402_reqwest`] - the negotiation itself, over `reqwest`.
//!
//! # Modules
//!
//! - [`config`] - command-line and JSON file configuration for the binary.
//! - [`signal`] - Ctrl-C handling that cancels a running negotiation.
//! - [`telemetry`] - log output setup.

pub mod config;
pub mod signal;
pub mod telemetry;

pub use x402_chain_eip155;
pub use x402_chain_solana;
pub use x402_reqwest;
pub use x402_types;

use x402_reqwest::NegotiationStatus;

/// Process exit code for a finished negotiation.
///
/// `0` when the resource was obtained, `2` when no payment went through.
/// Errors surfaced before any candidate was tried exit with `1`.
pub fn exit_code(status: NegotiationStatus) -> u8 {
    match status {
        NegotiationStatus::Free | NegotiationStatus::Settled => 0,
        NegotiationStatus::Exhausted | NegotiationStatus::Cancelled => 2,
    }
}
