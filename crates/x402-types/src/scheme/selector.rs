//! Candidate ordering by buyer preference.
//!
//! Two independent predicates decide whether an accepts entry matches: its chain
//! family against the preferred network, and its asset against the preferred asset.
//! Matching entries come first in server order. With fallback, the rest follow, also
//! in server order; without it they are dropped.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::chain::ChainFamily;
use crate::proto::PaymentRequirements;
use crate::scheme::client::X402Error;

/// The network a buyer would rather pay on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredNetwork {
    /// Any `eip155:` chain.
    Base,
    /// Any `solana:` cluster.
    Solana,
}

impl PreferredNetwork {
    pub fn family(&self) -> ChainFamily {
        match self {
            PreferredNetwork::Base => ChainFamily::Eip155,
            PreferredNetwork::Solana => ChainFamily::Solana,
        }
    }
}

/// The asset a buyer would rather pay with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreferredAsset {
    /// A canonical USDC deployment on any known chain.
    #[serde(rename = "USDC", alias = "usdc")]
    Usdc,
    /// Any non-USDC token on Solana.
    #[serde(rename = "native")]
    Native,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown preference {0:?}")]
pub struct PreferenceParseError(String);

impl FromStr for PreferredNetwork {
    type Err = PreferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" | "eip155" | "evm" => Ok(PreferredNetwork::Base),
            "solana" | "svm" => Ok(PreferredNetwork::Solana),
            _ => Err(PreferenceParseError(s.to_string())),
        }
    }
}

impl FromStr for PreferredAsset {
    type Err = PreferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usdc" => Ok(PreferredAsset::Usdc),
            "native" | "other" => Ok(PreferredAsset::Native),
            _ => Err(PreferenceParseError(s.to_string())),
        }
    }
}

impl Display for PreferredNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferredNetwork::Base => f.write_str("base"),
            PreferredNetwork::Solana => f.write_str("solana"),
        }
    }
}

impl Display for PreferredAsset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferredAsset::Usdc => f.write_str("USDC"),
            PreferredAsset::Native => f.write_str("native"),
        }
    }
}

/// Per-call negotiation preferences. An absent preference matches everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub network: Option<PreferredNetwork>,
    #[serde(default)]
    pub asset: Option<PreferredAsset>,
    #[serde(default = "allow_fallback_default")]
    pub allow_fallback: bool,
}

fn allow_fallback_default() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            network: None,
            asset: None,
            allow_fallback: true,
        }
    }
}

impl Preferences {
    pub fn with_network(mut self, network: PreferredNetwork) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_asset(mut self, asset: PreferredAsset) -> Self {
        self.asset = Some(asset);
        self
    }

    pub fn with_fallback(mut self, allow_fallback: bool) -> Self {
        self.allow_fallback = allow_fallback;
        self
    }

    fn matches_network(&self, requirements: &PaymentRequirements) -> bool {
        match self.network {
            None => true,
            Some(network) => requirements.family() == Some(network.family()),
        }
    }

    fn matches_asset(&self, requirements: &PaymentRequirements) -> bool {
        match self.asset {
            None => true,
            Some(PreferredAsset::Usdc) => requirements.is_usdc(),
            Some(PreferredAsset::Native) => {
                requirements.family() == Some(ChainFamily::Solana) && !requirements.is_usdc()
            }
        }
    }

    pub fn matches(&self, requirements: &PaymentRequirements) -> bool {
        self.matches_network(requirements) && self.matches_asset(requirements)
    }
}

/// Orders accepts entries into the sequence of candidates to attempt.
pub trait PaymentSelector: Send + Sync {
    /// Returns each entry at most once. Fails with [`X402Error::NoCompatibleMethod`]
    /// when nothing is left to try.
    fn order<'a>(
        &self,
        accepts: &'a [PaymentRequirements],
    ) -> Result<Vec<&'a PaymentRequirements>, X402Error>;

    /// Whether a failed candidate may be followed by the next one.
    fn allow_fallback(&self) -> bool;
}

impl PaymentSelector for Preferences {
    fn order<'a>(
        &self,
        accepts: &'a [PaymentRequirements],
    ) -> Result<Vec<&'a PaymentRequirements>, X402Error> {
        let (matching, rest): (Vec<_>, Vec<_>) = accepts.iter().partition(|r| self.matches(r));
        let mut ordered = matching;
        if self.allow_fallback {
            ordered.extend(rest);
        }
        if ordered.is_empty() {
            return Err(X402Error::NoCompatibleMethod);
        }
        Ok(ordered)
    }

    fn allow_fallback(&self) -> bool {
        self.allow_fallback
    }
}
