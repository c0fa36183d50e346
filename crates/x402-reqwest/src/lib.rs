#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Buyer-side [x402](https://www.x402.org) payment negotiation over `reqwest`.
//!
//! A [`Negotiator`] issues a request and, when the server answers
//! `402 Payment Required`, orders the offered payment methods by the buyer's
//! [`Preferences`](x402_types::scheme::selector::Preferences), builds a signed
//! payment for the first candidate it can pay, and retries the request with the
//! payment attached. Candidates that fail are skipped in favour of the next one
//! unless fallback is disabled.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use alloy_signer_local::PrivateKeySigner;
//! use x402_reqwest::{HttpRequest, Negotiator, ReqwestTransport, SigningContext, DEFAULT_REQUEST_TIMEOUT};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let signer: PrivateKeySigner = std::env::var("EVM_PRIVATE_KEY")?.parse()?;
//! let negotiator = Negotiator::new(
//!     ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT)?,
//!     SigningContext::new().with_evm_signer(signer),
//! );
//!
//! let outcome = negotiator
//!     .negotiate(HttpRequest::get("https://api.example.com/protected".parse()?))
//!     .await?;
//! if outcome.settled() {
//!     println!("paid with {:?}", outcome.settled_requirement);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Signers
//!
//! A [`SigningContext`] holds at most one EVM signer and one Solana signer. Payment
//! builders are created per negotiation, only for chains that both appear in the
//! server's `accepts` list and have a matching signer.
//!
//! ## Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

mod context;
mod negotiator;
mod outcome;
mod transport;

pub use context::*;
pub use negotiator::*;
pub use outcome::*;
pub use transport::*;
