//! CAIP-2 chain identifiers and chain families.
//!
//! A [CAIP-2](https://standards.chainagnostic.org/CAIPs/caip-2) chain ID consists of a
//! namespace and a reference separated by a colon:
//!
//! - **Namespace**: The blockchain ecosystem (`eip155` for EVM, `solana` for Solana)
//! - **Reference**: The chain-specific identifier (`8453` for Base)
//!
//! # Examples
//!
//! ```
//! use x402_types::chain::{ChainFamily, ChainId};
//!
//! let base: ChainId = "eip155:8453".parse().unwrap();
//! assert_eq!(base.namespace, "eip155");
//! assert_eq!(base.family(), Some(ChainFamily::Eip155));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

use crate::networks;

/// A CAIP-2 compliant blockchain identifier.
///
/// Serializes to/from a colon-separated string: `"eip155:8453"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    /// The blockchain namespace (e.g., `eip155` for EVM chains, `solana` for Solana).
    pub namespace: String,
    /// The chain-specific reference (e.g., `8453` for Base, `137` for Polygon).
    pub reference: String,
}

impl ChainId {
    /// Creates a new chain ID from namespace and reference components.
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// Returns the namespace component of the chain ID.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the reference component of the chain ID.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The chain family this ID belongs to, if the namespace is one the buyer can pay on.
    pub fn family(&self) -> Option<ChainFamily> {
        ChainFamily::from_namespace(&self.namespace)
    }

    /// Creates a chain ID from a well-known network name, e.g. `"base"`.
    ///
    /// ```
    /// use x402_types::chain::ChainId;
    ///
    /// let base = ChainId::from_network_name("base").unwrap();
    /// assert_eq!(base.to_string(), "eip155:8453");
    /// assert!(ChainId::from_network_name("unknown").is_none());
    /// ```
    pub fn from_network_name(network_name: &str) -> Option<Self> {
        networks::chain_id_by_network_name(network_name).cloned()
    }

    /// Returns the well-known network name for this chain ID, if any.
    pub fn as_network_name(&self) -> Option<&'static str> {
        networks::network_name_by_chain_id(self)
    }

    /// Rewrites a Solana cluster name (`solana:devnet`) to its genesis-hash
    /// reference. Every other chain ID is returned unchanged.
    pub fn canonical(self) -> Self {
        if self.family() != Some(ChainFamily::Solana) {
            return self;
        }
        match networks::solana_cluster_reference(&self.reference) {
            Some(reference) => ChainId::new(self.namespace, reference),
            None => self,
        }
    }

    /// Resolves a `network` field as found in a 402 body.
    ///
    /// CAIP-2 strings are taken in [canonical](Self::canonical) form; legacy
    /// network names (`"base-sepolia"`) are looked up in [`networks::KNOWN_NETWORKS`].
    ///
    /// ```
    /// use x402_types::chain::ChainId;
    ///
    /// assert_eq!(ChainId::resolve_network("solana").unwrap().namespace, "solana");
    /// assert_eq!(ChainId::resolve_network("eip155:1").unwrap().reference, "1");
    /// assert_eq!(
    ///     ChainId::resolve_network("solana:mainnet"),
    ///     ChainId::resolve_network("solana"),
    /// );
    /// assert!(ChainId::resolve_network("not-a-network").is_none());
    /// ```
    pub fn resolve_network(network: &str) -> Option<Self> {
        match ChainId::from_str(network) {
            Ok(chain_id) => Some(chain_id.canonical()),
            Err(_) => Self::from_network_name(network),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.to_string()
    }
}

/// Error returned when parsing an invalid chain ID string.
///
/// A valid chain ID must be in the format `namespace:reference` where both
/// components are non-empty strings.
#[derive(Debug, thiserror::Error)]
#[error("Invalid chain id format {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !namespace.is_empty() && !reference.is_empty() => {
                Ok(ChainId::new(namespace, reference))
            }
            _ => Err(ChainIdFormatError(s.into())),
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ChainId::from_str(&s).map_err(de::Error::custom)
    }
}

/// The chain families a buyer can construct payments for.
///
/// Builder resolution and candidate filtering match on this enum instead of
/// comparing namespace prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// EVM chains, CAIP-2 namespace `eip155`.
    Eip155,
    /// Solana clusters, CAIP-2 namespace `solana`.
    Solana,
}

impl ChainFamily {
    pub const EIP155_NAMESPACE: &'static str = "eip155";
    pub const SOLANA_NAMESPACE: &'static str = "solana";

    /// The single place where a CAIP-2 namespace is mapped to a family.
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            Self::EIP155_NAMESPACE => Some(ChainFamily::Eip155),
            Self::SOLANA_NAMESPACE => Some(ChainFamily::Solana),
            _ => None,
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            ChainFamily::Eip155 => Self::EIP155_NAMESPACE,
            ChainFamily::Solana => Self::SOLANA_NAMESPACE,
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}
