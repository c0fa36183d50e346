//! The `exact` scheme on Solana: a `TransferChecked` of exactly the requested amount,
//! signed by the buyer and left for the seller's fee payer to co-sign.

#[cfg(feature = "client")]
pub mod client;
pub mod types;

use x402_types::chain::ChainFamily;
use x402_types::proto::ExactScheme;
use x402_types::scheme::X402SchemeId;

pub use types::*;

/// Identifies the Solana `exact` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolanaExact;

impl X402SchemeId for SolanaExact {
    fn namespace(&self) -> &str {
        ChainFamily::Solana.namespace()
    }

    fn scheme(&self) -> &str {
        ExactScheme::VALUE
    }
}
