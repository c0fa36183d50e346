//! Wire types of the EVM `exact` payload.

use alloy_primitives::{B256, Bytes};
use serde::{Deserialize, Serialize};
use x402_types::proto::{PaymentRequirements, TokenAmount};
use x402_types::networks;
use x402_types::timestamp::UnixTimestamp;

use crate::chain::ChecksummedAddress;

#[cfg(feature = "client")]
use alloy_sol_types::sol;

/// Signed authorization sent as the scheme payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayload {
    /// 65-byte ECDSA signature, `0x`-hex encoded.
    pub signature: Bytes,
    pub authorization: ExactEvmPayloadAuthorization,
}

/// The ERC-3009 authorization as it appears on the wire.
///
/// Must carry exactly the values that were signed: the server rebuilds the EIP-712
/// struct from these fields to recover the signer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayloadAuthorization {
    pub from: ChecksummedAddress,
    pub to: ChecksummedAddress,
    pub value: TokenAmount,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
    pub nonce: B256,
}

/// EIP-712 domain `name` and `version` of the token contract.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirementsExtra {
    pub name: String,
    pub version: String,
}

impl PaymentRequirementsExtra {
    /// Domain parameters for `requirements`.
    ///
    /// `extra.name` and `extra.version` win. A known USDC deployment fills in what
    /// is missing. Anything still missing is an empty string.
    pub fn for_requirements(requirements: &PaymentRequirements) -> Self {
        let known = requirements
            .chain_id
            .as_ref()
            .and_then(|chain_id| networks::usdc_deployment(chain_id, &requirements.asset))
            .and_then(|deployment| deployment.eip712);
        let name = requirements
            .extra_str("name")
            .or(known.map(|(name, _)| name))
            .unwrap_or_default();
        let version = requirements
            .extra_str("version")
            .or(known.map(|(_, version)| version))
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

#[cfg(feature = "client")]
sol!(
    /// Solidity-compatible struct definition for ERC-3009 `transferWithAuthorization`.
    ///
    /// Authorizes a transfer of `value` tokens from `from` to `to`, valid only between
    /// `validAfter` and `validBefore`, and identified by a unique `nonce`.
    #[derive(Serialize, Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);
