//! The `exact` scheme on EVM chains: an ERC-3009 `transferWithAuthorization` for
//! exactly the requested amount, signed off-chain with EIP-712.

#[cfg(feature = "client")]
pub mod client;
pub mod types;

use x402_types::chain::ChainFamily;
use x402_types::proto::ExactScheme;
use x402_types::scheme::X402SchemeId;

pub use types::*;

/// Identifies the EVM `exact` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip155Exact;

impl X402SchemeId for Eip155Exact {
    fn namespace(&self) -> &str {
        ChainFamily::Eip155.namespace()
    }

    fn scheme(&self) -> &str {
        ExactScheme::VALUE
    }
}
