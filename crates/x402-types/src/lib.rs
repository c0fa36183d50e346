#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for buying resources over the x402 payment protocol.
//!
//! This crate holds everything that is blockchain-agnostic on the buyer side of an
//! HTTP 402 negotiation. Chain-specific payment construction lives in separate crates
//! (`x402-chain-eip155`, `x402-chain-solana`) that plug into the [`scheme`] registry.
//!
//! # Overview
//!
//! A buyer requests a paid resource and receives `402 Payment Required` with a list of
//! acceptable payment methods (`accepts`). The buyer orders those methods by preference,
//! builds a signed payment for one of them, and retries the request with the payment
//! attached in a header.
//!
//! # Modules
//!
//! - [`chain`] - CAIP-2 chain IDs and the chain family enumeration
//! - [`config`] - Environment variable resolution for configuration files
//! - [`networks`] - Well-known network names and USDC deployments
//! - [`proto`] - Wire format types (402 body, payment payloads, settlement response)
//! - [`scheme`] - Scheme client trait, scheme registry, candidate selection, error taxonomy
//! - [`timestamp`] - Unix timestamp utilities for payment authorization windows
//! - [`util`] - Helper types (base64, string literals, money amounts, retry policy)
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod chain;
pub mod config;
pub mod networks;
pub mod proto;
pub mod scheme;
pub mod timestamp;
pub mod util;
