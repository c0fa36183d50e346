//! Client-side payment signing for the EVM `exact` scheme.
//!
//! ```ignore
//! use x402_chain_eip155::Eip155ExactClient;
//! use alloy_signer_local::PrivateKeySigner;
//!
//! let client = Eip155ExactClient::new(PrivateKeySigner::random());
//! let signed = client.build_payload(&payment_required, &payment_required.accepts[0]).await?;
//! ```

use alloy_primitives::{Address, FixedBytes, Signature, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{SolStruct, eip712_domain};
use async_trait::async_trait;
use rand::{Rng, rng};
use std::sync::Arc;
use x402_types::proto::{PaymentKind, PaymentRequired, PaymentRequirements, TokenAmount};
use x402_types::scheme::X402SchemeId;
use x402_types::scheme::client::{SignedPayload, X402Error, X402SchemeClient};
use x402_types::timestamp::UnixTimestamp;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::Eip155ChainReference;
use crate::exact::{
    Eip155Exact, ExactEvmPayload, ExactEvmPayloadAuthorization, PaymentRequirementsExtra,
    TransferWithAuthorization,
};

/// How far `validAfter` is backdated, so clock skew never makes a fresh
/// authorization look premature.
const VALID_AFTER_BACKDATE_SECS: u64 = 10 * 60;

/// Builds ERC-3009 `transferWithAuthorization` payloads for any EVM chain.
///
/// One instance serves every `eip155` chain; the chain ID comes from each
/// requirement and only enters the EIP-712 domain.
#[derive(Debug)]
pub struct Eip155ExactClient<S> {
    signer: S,
}

impl<S> Eip155ExactClient<S> {
    pub fn new(signer: S) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }
}

impl<S> X402SchemeId for Eip155ExactClient<S> {
    fn namespace(&self) -> &str {
        Eip155Exact.namespace()
    }

    fn scheme(&self) -> &str {
        Eip155Exact.scheme()
    }
}

/// Parameters of one EIP-712 `TransferWithAuthorization` signature.
#[derive(Debug, Clone)]
pub struct Eip3009SigningParams {
    pub chain_reference: Eip155ChainReference,
    /// The token contract, also the EIP-712 verifying contract.
    pub asset_address: Address,
    pub pay_to: Address,
    pub amount: U256,
    /// Width of the window after now during which the authorization is valid.
    pub max_timeout_seconds: u64,
    pub extra: PaymentRequirementsExtra,
}

impl Eip3009SigningParams {
    pub fn from_requirements(requirements: &PaymentRequirements) -> Result<Self, X402Error> {
        let PaymentKind::Eip155Exact { chain_reference } = requirements.kind else {
            return Err(X402Error::UnsupportedNetwork {
                network: requirements.network.clone(),
                scheme: requirements.scheme.clone(),
            });
        };
        let asset_address: Address = requirements.asset.parse().map_err(|e| {
            X402Error::PaymentConstructionFailed(format!(
                "invalid asset address {}: {e}",
                requirements.asset
            ))
        })?;
        let pay_to: Address = requirements.pay_to.parse().map_err(|e| {
            X402Error::PaymentConstructionFailed(format!(
                "invalid payTo address {}: {e}",
                requirements.pay_to
            ))
        })?;
        Ok(Self {
            chain_reference: Eip155ChainReference::new(chain_reference),
            asset_address,
            pay_to,
            amount: requirements.amount.inner(),
            max_timeout_seconds: requirements.max_timeout_seconds,
            extra: PaymentRequirementsExtra::for_requirements(requirements),
        })
    }
}

/// Signs an ERC-3009 `TransferWithAuthorization` using EIP-712.
///
/// Every call draws a fresh random 32-byte nonce, so two signatures over the same
/// parameters are never interchangeable.
pub async fn sign_erc3009_authorization<S: SignerLike + Sync>(
    signer: &S,
    params: &Eip3009SigningParams,
) -> Result<ExactEvmPayload, X402Error> {
    let domain = eip712_domain! {
        name: params.extra.name.clone(),
        version: params.extra.version.clone(),
        chain_id: params.chain_reference.inner(),
        verifying_contract: params.asset_address,
    };

    let now = UnixTimestamp::now();
    let valid_after = now.saturating_sub(VALID_AFTER_BACKDATE_SECS);
    let valid_before = now + params.max_timeout_seconds;
    let nonce = FixedBytes(rng().random::<[u8; 32]>());

    let authorization = ExactEvmPayloadAuthorization {
        from: signer.address().into(),
        to: params.pay_to.into(),
        value: TokenAmount(params.amount),
        valid_after,
        valid_before,
        nonce,
    };

    let transfer_with_authorization = TransferWithAuthorization {
        from: authorization.from.into(),
        to: authorization.to.into(),
        value: authorization.value.inner(),
        validAfter: U256::from(authorization.valid_after.as_secs()),
        validBefore: U256::from(authorization.valid_before.as_secs()),
        nonce: authorization.nonce,
    };

    let eip712_hash = transfer_with_authorization.eip712_signing_hash(&domain);
    let signature = signer
        .sign_hash(&eip712_hash)
        .await
        .map_err(|e| X402Error::PaymentConstructionFailed(format!("signing failed: {e}")))?;

    Ok(ExactEvmPayload {
        signature: signature.as_bytes().into(),
        authorization,
    })
}

#[async_trait]
impl<S> X402SchemeClient for Eip155ExactClient<S>
where
    S: SignerLike + Send + Sync,
{
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "x402.eip155.build_payload",
            skip_all,
            fields(network = %requirements.network, asset = %requirements.asset),
            err
        )
    )]
    async fn build_payload(
        &self,
        payment_required: &PaymentRequired,
        requirements: &PaymentRequirements,
    ) -> Result<SignedPayload, X402Error> {
        let params = Eip3009SigningParams::from_requirements(requirements)?;
        let evm_payload = sign_erc3009_authorization(&self.signer, &params).await?;
        let payer = evm_payload.authorization.from.to_string();
        SignedPayload::new(payment_required, requirements, payer, evm_payload)
    }
}

/// Abstracts signing so owned, `Arc`-wrapped and trait-object signers all work.
///
/// Alloy's `Signer` is not implemented for `Arc<T>`, and `PrivateKeySigner` is
/// shared across builders through one.
#[async_trait]
pub trait SignerLike {
    fn address(&self) -> Address;

    async fn sign_hash(&self, hash: &FixedBytes<32>) -> Result<Signature, alloy_signer::Error>;
}

#[async_trait]
impl SignerLike for PrivateKeySigner {
    fn address(&self) -> Address {
        PrivateKeySigner::address(self)
    }

    async fn sign_hash(&self, hash: &FixedBytes<32>) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }
}

#[async_trait]
impl<T: SignerLike + Send + Sync + ?Sized> SignerLike for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &FixedBytes<32>) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use serde_json::json;

    fn payment_required(version: u8) -> PaymentRequired {
        PaymentRequired::from_value(json!({
            "x402Version": version,
            "resource": "https://api.example.com/paid",
            "accepts": [{
                "scheme": "exact",
                "network": if version == 1 { "base-sepolia" } else { "eip155:84532" },
                "asset": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
                "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "amount": "10000",
                "maxTimeoutSeconds": 120
            }]
        }))
        .unwrap()
    }

    fn authorization(signed: &SignedPayload) -> ExactEvmPayload {
        serde_json::from_value(signed.scheme_payload().cloned().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_distinct_builds_use_distinct_nonces() {
        let client = Eip155ExactClient::new(PrivateKeySigner::random());
        let required = payment_required(2);
        let first = client
            .build_payload(&required, &required.accepts[0])
            .await
            .unwrap();
        let second = client
            .build_payload(&required, &required.accepts[0])
            .await
            .unwrap();
        assert_ne!(
            authorization(&first).authorization.nonce,
            authorization(&second).authorization.nonce
        );
    }

    #[tokio::test]
    async fn test_authorization_matches_requirements() {
        let signer = PrivateKeySigner::random();
        let address = signer.address();
        let client = Eip155ExactClient::new(Arc::new(signer));
        let required = payment_required(2);
        let signed = client
            .build_payload(&required, &required.accepts[0])
            .await
            .unwrap();
        let payload = authorization(&signed);
        let auth = payload.authorization;
        assert_eq!(Address::from(auth.from), address);
        assert_eq!(signed.payer, address.to_checksum(None));
        assert_eq!(auth.value, TokenAmount(U256::from(10_000u64)));
        let window = auth.valid_before.as_secs() - auth.valid_after.as_secs();
        assert_eq!(window, 120 + VALID_AFTER_BACKDATE_SECS);
        assert_eq!(payload.signature.len(), 65);
        assert_eq!(signed.header_name, "Payment-Signature");
    }

    #[tokio::test]
    async fn test_signature_recovers_to_signer() {
        let signer = PrivateKeySigner::random();
        let required = payment_required(1);
        let requirements = &required.accepts[0];
        let params = Eip3009SigningParams::from_requirements(requirements).unwrap();
        let payload = sign_erc3009_authorization(&signer, &params).await.unwrap();
        let auth = payload.authorization;
        let domain = eip712_domain! {
            name: "USDC".to_string(),
            version: "2".to_string(),
            chain_id: 84532u64,
            verifying_contract: params.asset_address,
        };
        let hash: B256 = TransferWithAuthorization {
            from: auth.from.into(),
            to: auth.to.into(),
            value: auth.value.inner(),
            validAfter: U256::from(auth.valid_after.as_secs()),
            validBefore: U256::from(auth.valid_before.as_secs()),
            nonce: auth.nonce,
        }
        .eip712_signing_hash(&domain);
        let signature = Signature::try_from(payload.signature.as_ref()).unwrap();
        assert_eq!(
            signature.recover_address_from_prehash(&hash).unwrap(),
            signer.address()
        );
    }

    #[tokio::test]
    async fn test_v1_envelope_names_network() {
        let client = Eip155ExactClient::new(PrivateKeySigner::random());
        let required = payment_required(1);
        let signed = client
            .build_payload(&required, &required.accepts[0])
            .await
            .unwrap();
        assert_eq!(signed.header_name, "X-PAYMENT");
        assert_eq!(signed.payload["network"], json!("base-sepolia"));
        assert_eq!(signed.payload["scheme"], json!("exact"));
    }

    #[tokio::test]
    async fn test_invalid_pay_to_is_construction_failure() {
        let client = Eip155ExactClient::new(PrivateKeySigner::random());
        let mut required = payment_required(2);
        required.accepts[0].pay_to = "not-an-address".into();
        let err = client
            .build_payload(&required, &required.accepts[0])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PaymentConstructionFailed");
    }
}
