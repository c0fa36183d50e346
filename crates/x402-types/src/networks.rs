//! Known blockchain networks and USDC deployments.
//!
//! Two lookup tables live here:
//!
//! - [`KNOWN_NETWORKS`] maps legacy (x402 v1) network names such as `"base-sepolia"`
//!   to CAIP-2 chain IDs. Servers still speaking v1 put these names in `network`.
//! - [`USDC_DEPLOYMENTS`] lists canonical USDC contracts and mints. The candidate
//!   selector uses it to decide whether an accepts entry is priced in USDC, and the
//!   EVM builder uses it for EIP-712 domain defaults when `extra` carries none.
//!
//! ```
//! use x402_types::chain::ChainId;
//! use x402_types::networks::{chain_id_by_network_name, is_usdc};
//!
//! let polygon = chain_id_by_network_name("polygon").unwrap();
//! assert_eq!(polygon, &ChainId::new("eip155", "137"));
//!
//! assert!(is_usdc("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"));
//! assert!(is_usdc("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::chain::{ChainFamily, ChainId};

/// A known network definition with its chain ID and human-readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name (e.g., "base-sepolia", "solana")
    pub name: &'static str,
    /// CAIP-2 namespace (e.g., "eip155", "solana")
    pub namespace: &'static str,
    /// Chain reference (e.g., "84532" for Base Sepolia)
    pub reference: &'static str,
}

impl NetworkInfo {
    /// Create a ChainId from this network info
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

/// Well-known networks, EVM first, then Solana.
pub static KNOWN_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "ethereum",
        namespace: "eip155",
        reference: "1",
    },
    NetworkInfo {
        name: "base",
        namespace: "eip155",
        reference: "8453",
    },
    NetworkInfo {
        name: "base-sepolia",
        namespace: "eip155",
        reference: "84532",
    },
    NetworkInfo {
        name: "polygon",
        namespace: "eip155",
        reference: "137",
    },
    NetworkInfo {
        name: "polygon-amoy",
        namespace: "eip155",
        reference: "80002",
    },
    NetworkInfo {
        name: "avalanche",
        namespace: "eip155",
        reference: "43114",
    },
    NetworkInfo {
        name: "avalanche-fuji",
        namespace: "eip155",
        reference: "43113",
    },
    NetworkInfo {
        name: "sei",
        namespace: "eip155",
        reference: "1329",
    },
    NetworkInfo {
        name: "sei-testnet",
        namespace: "eip155",
        reference: "1328",
    },
    NetworkInfo {
        name: "celo",
        namespace: "eip155",
        reference: "42220",
    },
    NetworkInfo {
        name: "celo-sepolia",
        namespace: "eip155",
        reference: "11142220",
    },
    NetworkInfo {
        name: "solana",
        namespace: "solana",
        reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    },
    NetworkInfo {
        name: "solana-devnet",
        namespace: "solana",
        reference: "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
    },
];

pub static NAME_TO_CHAIN_ID: LazyLock<HashMap<&'static str, ChainId>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.name, n.chain_id()))
        .collect()
});

pub static CHAIN_ID_TO_NAME: LazyLock<HashMap<ChainId, &'static str>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.chain_id(), n.name))
        .collect()
});

/// Solana cluster names accepted as CAIP-2 references, with the genesis-hash
/// reference each stands for.
pub static SOLANA_CLUSTER_ALIASES: &[(&str, &str)] = &[
    ("mainnet", "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"),
    ("mainnet-beta", "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"),
    ("devnet", "EtWTRABZaYq6iMfeYKouRu166VU2xqa1"),
];

/// The genesis-hash reference for a Solana cluster name such as `"devnet"`.
pub fn solana_cluster_reference(cluster: &str) -> Option<&'static str> {
    SOLANA_CLUSTER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == cluster)
        .map(|(_, reference)| *reference)
}

/// Retrieves a ChainId by its network name. The lookup is case-sensitive.
pub fn chain_id_by_network_name(name: &str) -> Option<&ChainId> {
    NAME_TO_CHAIN_ID.get(name)
}

/// Retrieves a network name by its ChainId.
pub fn network_name_by_chain_id(chain_id: &ChainId) -> Option<&'static str> {
    CHAIN_ID_TO_NAME.get(chain_id).copied()
}

/// A canonical USDC deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdcDeployment {
    /// CAIP-2 namespace of the hosting chain.
    pub namespace: &'static str,
    /// CAIP-2 reference of the hosting chain.
    pub reference: &'static str,
    /// ERC-20 contract address (EVM) or mint public key (Solana).
    pub address: &'static str,
    /// Token decimals. Always 6 for USDC.
    pub decimals: u8,
    /// EIP-712 domain `(name, version)` of the token contract. EVM only.
    pub eip712: Option<(&'static str, &'static str)>,
}

impl UsdcDeployment {
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }

    pub fn family(&self) -> Option<ChainFamily> {
        ChainFamily::from_namespace(self.namespace)
    }

    /// EVM addresses compare case-insensitively, Solana mints exactly.
    pub fn matches_asset(&self, asset: &str) -> bool {
        match self.family() {
            Some(ChainFamily::Eip155) => self.address.eq_ignore_ascii_case(asset),
            _ => self.address == asset,
        }
    }
}

pub static USDC_DEPLOYMENTS: &[UsdcDeployment] = &[
    UsdcDeployment {
        namespace: "eip155",
        reference: "8453",
        address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        decimals: 6,
        eip712: Some(("USD Coin", "2")),
    },
    UsdcDeployment {
        namespace: "eip155",
        reference: "84532",
        address: "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
        decimals: 6,
        eip712: Some(("USDC", "2")),
    },
    UsdcDeployment {
        namespace: "eip155",
        reference: "1",
        address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        decimals: 6,
        eip712: Some(("USD Coin", "2")),
    },
    UsdcDeployment {
        namespace: "eip155",
        reference: "137",
        address: "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359",
        decimals: 6,
        eip712: Some(("USDC", "2")),
    },
    UsdcDeployment {
        namespace: "eip155",
        reference: "80002",
        address: "0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582",
        decimals: 6,
        eip712: Some(("USDC", "2")),
    },
    UsdcDeployment {
        namespace: "eip155",
        reference: "43114",
        address: "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E",
        decimals: 6,
        eip712: Some(("USD Coin", "2")),
    },
    UsdcDeployment {
        namespace: "eip155",
        reference: "43113",
        address: "0x5425890298aed601595a70AB815c96711a31Bc65",
        decimals: 6,
        eip712: Some(("USD Coin", "2")),
    },
    UsdcDeployment {
        namespace: "eip155",
        reference: "42220",
        address: "0xcebA9300f2b948710d2653dD7B07f33A8B32118C",
        decimals: 6,
        eip712: Some(("USDC", "2")),
    },
    UsdcDeployment {
        namespace: "solana",
        reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        address: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        decimals: 6,
        eip712: None,
    },
    UsdcDeployment {
        namespace: "solana",
        reference: "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
        address: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        decimals: 6,
        eip712: None,
    },
];

/// Whether `asset` is a canonical USDC deployment on any known chain.
pub fn is_usdc(asset: &str) -> bool {
    USDC_DEPLOYMENTS.iter().any(|d| d.matches_asset(asset))
}

/// The USDC deployment of `asset` on `chain_id`, if any.
pub fn usdc_deployment(chain_id: &ChainId, asset: &str) -> Option<&'static UsdcDeployment> {
    USDC_DEPLOYMENTS.iter().find(|d| {
        d.namespace == chain_id.namespace && d.reference == chain_id.reference && d.matches_asset(asset)
    })
}
