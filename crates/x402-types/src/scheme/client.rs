//! Buyer-side scheme client contract and the shared error type.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::proto::{
    PAYMENT_SIGNATURE_HEADER, PaymentRequired, PaymentRequirements, RequirementId,
    X_PAYMENT_HEADER, v1, v2,
};
use crate::scheme::X402SchemeId;
use crate::util::Base64Bytes;

/// Everything that can go wrong while negotiating and paying for a resource.
///
/// Each variant has a stable [`code`](X402Error::code) that outcomes report next to
/// the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum X402Error {
    #[error("402 body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Malformed payment requirements: {0}")]
    MalformedRequirements(String),
    #[error("No accepts entry matches the buyer preferences")]
    NoCompatibleMethod,
    #[error("No builder registered for scheme {scheme} on network {network}")]
    UnsupportedNetwork { network: String, scheme: String },
    #[error("Solana requirements carry no extra.feePayer")]
    MissingFeePayer,
    #[error("Mint account {0} not found")]
    MintNotFound(String),
    #[error("Mint account {mint} data is {len} bytes, too short to hold decimals")]
    InvalidMintData { mint: String, len: usize },
    #[error("Failed to derive associated token account: {0}")]
    AddressDerivationFailed(String),
    #[error("Chain query failed: {0}")]
    ChainQueryFailed(String),
    #[error("Failed to construct payment: {0}")]
    PaymentConstructionFailed(String),
    #[error("Server rejected the payment with status {status}")]
    SettlementRejected { status: u16, body: String },
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    #[error("No signer configured for any offered network")]
    NoSignerConfigured,
    #[error("Unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Negotiation cancelled")]
    Cancelled,
}

impl X402Error {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            X402Error::InvalidJson(_) => "InvalidJson",
            X402Error::MalformedRequirements(_) => "MalformedRequirements",
            X402Error::NoCompatibleMethod => "NoCompatibleMethod",
            X402Error::UnsupportedNetwork { .. } => "UnsupportedNetwork",
            X402Error::MissingFeePayer => "MissingFeePayer",
            X402Error::MintNotFound(_) => "MintNotFound",
            X402Error::InvalidMintData { .. } => "InvalidMintData",
            X402Error::AddressDerivationFailed(_) => "AddressDerivationFailed",
            X402Error::ChainQueryFailed(_) => "ChainQueryFailed",
            X402Error::PaymentConstructionFailed(_) => "PaymentConstructionFailed",
            X402Error::SettlementRejected { .. } => "SettlementRejected",
            X402Error::TransportFailure(_) => "TransportFailure",
            X402Error::NoSignerConfigured => "NoSignerConfigured",
            X402Error::UnexpectedStatus { .. } => "UnexpectedStatus",
            X402Error::Cancelled => "Cancelled",
        }
    }
}

impl Serialize for X402Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("X402Error", 2)?;
        s.serialize_field("code", self.code())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

impl From<serde_json::Error> for X402Error {
    fn from(value: serde_json::Error) -> Self {
        X402Error::PaymentConstructionFailed(value.to_string())
    }
}

/// A signed payment ready to attach to the retried request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub requirement: RequirementId,
    /// Address or public key of the paying account.
    pub payer: String,
    /// `Payment-Signature` for v2 servers, `X-PAYMENT` for v1.
    pub header_name: &'static str,
    /// The full envelope, before base64 encoding.
    pub payload: Value,
}

impl SignedPayload {
    /// Wraps a scheme payload in the envelope matching the server's protocol version.
    pub fn new<T: Serialize>(
        payment_required: &PaymentRequired,
        requirements: &PaymentRequirements,
        payer: impl Into<String>,
        scheme_payload: T,
    ) -> Result<Self, X402Error> {
        let (header_name, payload) = if payment_required.x402_version == v1::X402Version1::VALUE {
            let envelope = v1::PaymentPayload {
                x402_version: v1::X402Version1,
                scheme: requirements.scheme.clone(),
                network: requirements.network.clone(),
                payload: scheme_payload,
            };
            (X_PAYMENT_HEADER, serde_json::to_value(envelope)?)
        } else {
            let envelope = v2::PaymentPayload {
                x402_version: v2::X402Version2,
                resource: payment_required.resource.clone(),
                accepted: requirements.raw.clone(),
                payload: scheme_payload,
            };
            (PAYMENT_SIGNATURE_HEADER, serde_json::to_value(envelope)?)
        };
        Ok(SignedPayload {
            requirement: requirements.id(),
            payer: payer.into(),
            header_name,
            payload,
        })
    }

    /// The base64 header value.
    pub fn header_value(&self) -> Result<String, X402Error> {
        Ok(Base64Bytes::encode_json(&self.payload)?.to_string())
    }

    /// The scheme-specific part of the envelope.
    pub fn scheme_payload(&self) -> Option<&Value> {
        self.payload.get("payload")
    }
}

/// Builds signed payloads for one scheme on one chain family.
///
/// Builders never perform the paid request themselves. They may query the chain
/// (Solana needs the mint and a recent blockhash) but hold no per-request state.
#[async_trait::async_trait]
pub trait X402SchemeClient: X402SchemeId + Send + Sync {
    async fn build_payload(
        &self,
        payment_required: &PaymentRequired,
        requirements: &PaymentRequirements,
    ) -> Result<SignedPayload, X402Error>;
}
