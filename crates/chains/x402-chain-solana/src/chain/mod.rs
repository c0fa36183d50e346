//! Solana cluster identifiers, default endpoints, and RPC access.

#[cfg(feature = "client")]
pub mod rpc;

use solana_pubkey::Pubkey;
use std::str::FromStr;
use x402_types::chain::{ChainFamily, ChainId};
use x402_types::networks::chain_id_by_network_name;
use x402_types::scheme::client::X402Error;

/// Public RPC endpoint of mainnet-beta.
pub const SOLANA_MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
/// Public RPC endpoint of devnet.
pub const SOLANA_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// The public RPC endpoint for a known Solana cluster.
///
/// ```
/// use x402_chain_solana::chain::default_rpc_url;
/// use x402_types::chain::ChainId;
///
/// let mainnet = ChainId::new("solana", "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp");
/// assert_eq!(default_rpc_url(&mainnet), Some("https://api.mainnet-beta.solana.com"));
/// ```
pub fn default_rpc_url(chain_id: &ChainId) -> Option<&'static str> {
    if chain_id.family() != Some(ChainFamily::Solana) {
        return None;
    }
    let chain_id = chain_id.clone().canonical();
    if Some(&chain_id) == chain_id_by_network_name("solana") {
        Some(SOLANA_MAINNET_RPC_URL)
    } else if Some(&chain_id) == chain_id_by_network_name("solana-devnet") {
        Some(SOLANA_DEVNET_RPC_URL)
    } else {
        None
    }
}

/// Parses a base58 public key taken from a requirement field.
pub fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, X402Error> {
    Pubkey::from_str(value).map_err(|e| {
        X402Error::AddressDerivationFailed(format!("{field} {value:?} is not a public key: {e}"))
    })
}
