//! Wire format types for the buyer side of x402.
//!
//! A 402 response carries a [`PaymentRequired`] document, either as the JSON body or
//! base64-encoded in the `Payment-Required` header. Each `accepts` entry becomes a
//! [`PaymentRequirements`] whose [`PaymentKind`] is decided once, at parse time. Every
//! later stage matches on that kind instead of re-inspecting strings.
//!
//! The signed payment travels back in an envelope whose shape follows the server's
//! protocol version, see [`v1`] and [`v2`].

pub mod v1;
pub mod v2;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::chain::{ChainFamily, ChainId};
use crate::lit_str;
use crate::networks;
use crate::scheme::client::X402Error;
use crate::util::money_amount::MoneyAmount;

lit_str!(ExactScheme, "exact");

/// Declares a zero-sized protocol version marker that serializes as a bare integer.
macro_rules! version_marker {
    ($name:ident, $value:literal) => {
        #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
        pub struct $name;

        impl $name {
            pub const VALUE: u8 = $value;
        }

        impl From<$name> for u8 {
            fn from(_: $name) -> Self {
                $name::VALUE
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u8(Self::VALUE)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let version = <u8 as serde::Deserialize>::deserialize(deserializer)?;
                if version == Self::VALUE {
                    Ok($name)
                } else {
                    Err(serde::de::Error::custom(format!(
                        "expected x402Version {}, got {version}",
                        Self::VALUE
                    )))
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", Self::VALUE)
            }
        }
    };
}

pub(crate) use version_marker;

/// Header carrying the base64 [`PaymentRequired`] document on v2 servers.
pub const PAYMENT_REQUIRED_HEADER: &str = "Payment-Required";
/// Header carrying the v2 payment payload.
pub const PAYMENT_SIGNATURE_HEADER: &str = "Payment-Signature";
/// Header carrying the v1 payment payload.
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";
/// Header carrying the v2 settlement response.
pub const PAYMENT_RESPONSE_HEADER: &str = "Payment-Response";
/// Header carrying the v1 settlement response.
pub const X_PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Seconds an authorization stays valid when the server does not say.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

/// An amount in the asset's smallest unit.
///
/// Serialized as a base-10 string. Deserializes from a base-10 string or a
/// non-negative JSON integer; anything else (negative, fractional, hex) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenAmount(pub U256);

impl TokenAmount {
    pub fn inner(&self) -> U256 {
        self.0
    }

    fn parse_decimal(s: &str) -> Result<Self, String> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("amount must be a non-negative base-10 integer, got {s:?}"));
        }
        U256::from_str_radix(s, 10)
            .map(TokenAmount)
            .map_err(|e| format!("amount {s:?} out of range: {e}"))
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => TokenAmount::parse_decimal(&s).map_err(serde::de::Error::custom),
            Value::Number(n) => match n.as_u64() {
                Some(n) => Ok(TokenAmount(U256::from(n))),
                None => Err(serde::de::Error::custom(format!(
                    "amount must be a non-negative integer, got {n}"
                ))),
            },
            other => Err(serde::de::Error::custom(format!(
                "amount must be a string or integer, got {other}"
            ))),
        }
    }
}

/// Metadata about the resource being paid for.
///
/// Servers send either a bare URL string or an object; both deserialize here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceInfo {
    pub fn from_url<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            description: None,
            mime_type: None,
        }
    }
}

impl<'de> Deserialize<'de> for ResourceInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Url(String),
            #[serde(rename_all = "camelCase")]
            Info {
                url: String,
                description: Option<String>,
                mime_type: Option<String>,
            },
        }
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Url(url) => ResourceInfo::from_url(url),
            Wire::Info {
                url,
                description,
                mime_type,
            } => ResourceInfo {
                url,
                description,
                mime_type,
            },
        })
    }
}

/// The scheme/network pairs this buyer knows how to pay, decided at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentKind {
    /// `exact` on an `eip155` chain with a numeric chain id.
    Eip155Exact { chain_reference: u64 },
    /// `exact` on a Solana cluster. `fee_payer` comes from `extra.feePayer`.
    SolanaExact { fee_payer: Option<String> },
    /// Anything else. Kept so fallback still records an attempt for it.
    Unrecognized,
}

impl PaymentKind {
    fn classify(scheme: &str, chain_id: Option<&ChainId>, extra: &Map<String, Value>) -> Self {
        let Some(chain_id) = chain_id else {
            return PaymentKind::Unrecognized;
        };
        if !ExactScheme::matches(scheme) {
            return PaymentKind::Unrecognized;
        }
        match chain_id.family() {
            Some(ChainFamily::Eip155) => match chain_id.reference.parse::<u64>() {
                Ok(chain_reference) => PaymentKind::Eip155Exact { chain_reference },
                Err(_) => PaymentKind::Unrecognized,
            },
            Some(ChainFamily::Solana) => PaymentKind::SolanaExact {
                fee_payer: extra
                    .get("feePayer")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            None => PaymentKind::Unrecognized,
        }
    }

    pub fn family(&self) -> Option<ChainFamily> {
        match self {
            PaymentKind::Eip155Exact { .. } => Some(ChainFamily::Eip155),
            PaymentKind::SolanaExact { .. } => Some(ChainFamily::Solana),
            PaymentKind::Unrecognized => None,
        }
    }
}

/// Identifies one accepts entry in outcomes and logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementId {
    /// Position in the server's `accepts` array.
    pub index: usize,
    pub scheme: String,
    pub network: String,
    pub asset: String,
}

impl Display for RequirementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} on {} ({})",
            self.index, self.scheme, self.network, self.asset
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequirementsWire {
    scheme: String,
    network: String,
    asset: String,
    pay_to: String,
    #[serde(default)]
    amount: Option<TokenAmount>,
    #[serde(default)]
    max_amount_required: Option<TokenAmount>,
    #[serde(default)]
    max_timeout_seconds: Option<u64>,
    #[serde(default)]
    extra: Option<Map<String, Value>>,
}

/// One acceptable payment method, immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequirements {
    /// Position in the server's `accepts` array.
    pub index: usize,
    pub scheme: String,
    /// The `network` field as the server sent it.
    pub network: String,
    /// `network` resolved to CAIP-2, if it is CAIP-2 or a known legacy name.
    pub chain_id: Option<ChainId>,
    /// Token contract (EVM) or mint (Solana).
    pub asset: String,
    pub pay_to: String,
    pub amount: TokenAmount,
    pub max_timeout_seconds: u64,
    pub extra: Map<String, Value>,
    pub kind: PaymentKind,
    /// The entry exactly as received, echoed back as `accepted` in v2 payloads.
    pub raw: Value,
}

impl PaymentRequirements {
    /// Parses one accepts entry. Errors describe which structural rule failed.
    pub fn from_json(index: usize, raw: &Value) -> Result<Self, String> {
        let wire = PaymentRequirementsWire::deserialize(raw).map_err(|e| e.to_string())?;
        for (field, value) in [
            ("scheme", &wire.scheme),
            ("network", &wire.network),
            ("asset", &wire.asset),
            ("payTo", &wire.pay_to),
        ] {
            if value.trim().is_empty() {
                return Err(format!("field `{field}` is empty"));
            }
        }
        let amount = wire
            .amount
            .or(wire.max_amount_required)
            .ok_or("missing `amount` or `maxAmountRequired`")?;
        let chain_id = ChainId::resolve_network(&wire.network);
        let extra = wire.extra.unwrap_or_default();
        let kind = PaymentKind::classify(&wire.scheme, chain_id.as_ref(), &extra);
        Ok(PaymentRequirements {
            index,
            scheme: wire.scheme,
            network: wire.network,
            chain_id,
            asset: wire.asset,
            pay_to: wire.pay_to,
            amount,
            max_timeout_seconds: wire
                .max_timeout_seconds
                .unwrap_or(DEFAULT_MAX_TIMEOUT_SECONDS),
            extra,
            kind,
            raw: raw.clone(),
        })
    }

    pub fn id(&self) -> RequirementId {
        RequirementId {
            index: self.index,
            scheme: self.scheme.clone(),
            network: self.network.clone(),
            asset: self.asset.clone(),
        }
    }

    pub fn family(&self) -> Option<ChainFamily> {
        self.chain_id.as_ref().and_then(ChainId::family)
    }

    /// Whether the asset is a canonical USDC deployment.
    pub fn is_usdc(&self) -> bool {
        networks::is_usdc(&self.asset)
    }

    /// The price in whole USDC, when the asset is a known USDC deployment.
    pub fn usd_amount(&self) -> Option<MoneyAmount> {
        let chain_id = self.chain_id.as_ref()?;
        let deployment = networks::usdc_deployment(chain_id, &self.asset)?;
        MoneyAmount::from_token_units(self.amount.inner(), deployment.decimals.into())
    }

    /// A string value from `extra`, e.g. the EIP-712 domain `name`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// A parsed 402 document.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequired {
    /// Protocol version the server speaks; selects the payment envelope.
    pub x402_version: u8,
    /// Entries in the server's order. Never empty.
    pub accepts: Vec<PaymentRequirements>,
    pub resource: Option<ResourceInfo>,
    /// The document exactly as received.
    pub raw: Value,
}

impl PaymentRequired {
    /// Parses a 402 body.
    ///
    /// Fails with [`X402Error::InvalidJson`] when the body is not JSON and with
    /// [`X402Error::MalformedRequirements`] when `accepts` is missing, empty, or
    /// holds a structurally invalid entry.
    pub fn parse(body: &[u8]) -> Result<Self, X402Error> {
        let raw: Value =
            serde_json::from_slice(body).map_err(|e| X402Error::InvalidJson(e.to_string()))?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Self, X402Error> {
        let object = raw.as_object().ok_or_else(|| {
            X402Error::MalformedRequirements("402 body is not a JSON object".to_string())
        })?;
        let entries = match object.get("accepts") {
            Some(Value::Array(entries)) if !entries.is_empty() => entries,
            Some(Value::Array(_)) => {
                return Err(X402Error::MalformedRequirements(
                    "`accepts` is empty".to_string(),
                ));
            }
            Some(_) => {
                return Err(X402Error::MalformedRequirements(
                    "`accepts` is not an array".to_string(),
                ));
            }
            None => {
                return Err(X402Error::MalformedRequirements(
                    "`accepts` is missing".to_string(),
                ));
            }
        };
        let accepts = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                PaymentRequirements::from_json(index, entry).map_err(|e| {
                    X402Error::MalformedRequirements(format!("accepts[{index}]: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let resource = match object.get("resource") {
            None | Some(Value::Null) => None,
            Some(value) => Some(ResourceInfo::deserialize(value).map_err(|e| {
                X402Error::MalformedRequirements(format!("resource: {e}"))
            })?),
        };
        let x402_version = object
            .get("x402Version")
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
            .unwrap_or(v2::X402Version2::VALUE);
        Ok(PaymentRequired {
            x402_version,
            accepts,
            resource,
            raw,
        })
    }
}

/// The server's settlement report, from the `Payment-Response` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evm_entry() -> Value {
        json!({
            "scheme": "exact",
            "network": "eip155:8453",
            "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
            "amount": "10000",
            "maxTimeoutSeconds": 60,
            "extra": {"name": "USD Coin", "version": "2"}
        })
    }

    fn solana_entry() -> Value {
        json!({
            "scheme": "exact",
            "network": "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
            "asset": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "payTo": "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
            "maxAmountRequired": 2500,
            "extra": {"feePayer": "2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4"}
        })
    }

    #[test]
    fn test_parse_preserves_order_and_classifies() {
        let body = json!({
            "x402Version": 2,
            "resource": "https://api.example.com/weather",
            "accepts": [solana_entry(), evm_entry()]
        });
        let parsed = PaymentRequired::parse(body.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.accepts.len(), 2);
        assert_eq!(parsed.accepts[0].index, 0);
        assert_eq!(
            parsed.accepts[0].kind,
            PaymentKind::SolanaExact {
                fee_payer: Some("2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4".into())
            }
        );
        assert_eq!(
            parsed.accepts[1].kind,
            PaymentKind::Eip155Exact {
                chain_reference: 8453
            }
        );
        assert_eq!(parsed.accepts[0].amount, TokenAmount(U256::from(2500u64)));
        assert_eq!(parsed.accepts[1].max_timeout_seconds, 60);
        assert_eq!(
            parsed.resource,
            Some(ResourceInfo::from_url("https://api.example.com/weather"))
        );
        assert_eq!(parsed.accepts[1].raw, evm_entry());
    }

    #[test]
    fn test_invalid_json() {
        let err = PaymentRequired::parse(b"<html>402</html>").unwrap_err();
        assert_eq!(err.code(), "InvalidJson");
    }

    #[test]
    fn test_missing_or_empty_accepts() {
        let err = PaymentRequired::parse(br#"{"error": "pay up"}"#).unwrap_err();
        assert_eq!(err.code(), "MalformedRequirements");
        let err = PaymentRequired::parse(br#"{"accepts": []}"#).unwrap_err();
        assert_eq!(err.code(), "MalformedRequirements");
    }

    #[test]
    fn test_entry_without_amount_is_malformed() {
        let mut entry = evm_entry();
        entry.as_object_mut().unwrap().remove("amount");
        let body = json!({ "accepts": [entry] });
        let err = PaymentRequired::from_value(body).unwrap_err();
        assert!(matches!(err, X402Error::MalformedRequirements(ref m) if m.starts_with("accepts[0]")));
    }

    #[test]
    fn test_negative_or_fractional_amount_is_malformed() {
        for amount in [json!("-5"), json!(1.5), json!(-5), json!("0x10")] {
            let mut entry = evm_entry();
            entry["amount"] = amount;
            let err = PaymentRequired::from_value(json!({ "accepts": [entry] })).unwrap_err();
            assert_eq!(err.code(), "MalformedRequirements");
        }
    }

    #[test]
    fn test_unknown_scheme_or_network_is_unrecognized() {
        let mut upto = evm_entry();
        upto["scheme"] = json!("upto");
        let mut aptos = evm_entry();
        aptos["network"] = json!("aptos:1");
        let mut nameless = evm_entry();
        nameless["network"] = json!("moonchain");
        let parsed =
            PaymentRequired::from_value(json!({ "accepts": [upto, aptos, nameless] })).unwrap();
        assert!(parsed.accepts.iter().all(|r| r.kind == PaymentKind::Unrecognized));
        assert!(parsed.accepts[2].chain_id.is_none());
    }

    #[test]
    fn test_legacy_network_name_resolves() {
        let mut entry = evm_entry();
        entry["network"] = json!("base-sepolia");
        let parsed =
            PaymentRequired::from_value(json!({ "x402Version": 1, "accepts": [entry] })).unwrap();
        assert_eq!(parsed.x402_version, 1);
        assert_eq!(
            parsed.accepts[0].chain_id,
            Some(ChainId::new("eip155", "84532"))
        );
        assert_eq!(
            parsed.accepts[0].kind,
            PaymentKind::Eip155Exact {
                chain_reference: 84532
            }
        );
    }

    #[test]
    fn test_usd_amount_only_for_usdc() {
        let parsed = PaymentRequired::from_value(json!({ "accepts": [evm_entry()] })).unwrap();
        assert_eq!(
            parsed.accepts[0].usd_amount().map(|a| a.to_string()),
            Some("0.01".to_string())
        );
        let mut other = evm_entry();
        other["asset"] = json!("0x0000000000000000000000000000000000000001");
        let parsed = PaymentRequired::from_value(json!({ "accepts": [other] })).unwrap();
        assert!(parsed.accepts[0].usd_amount().is_none());
    }

    #[test]
    fn test_resource_object_form() {
        let body = json!({
            "resource": {"url": "https://x.test/a", "description": "A", "mimeType": "text/plain"},
            "accepts": [evm_entry()]
        });
        let parsed = PaymentRequired::from_value(body).unwrap();
        let resource = parsed.resource.unwrap();
        assert_eq!(resource.mime_type.as_deref(), Some("text/plain"));
    }
}
