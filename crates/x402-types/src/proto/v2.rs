//! Protocol version 2 envelope.
//!
//! v2 servers identify networks by CAIP-2 chain ID and expect the payment in the
//! `Payment-Signature` header. The envelope echoes the chosen accepts entry verbatim
//! as `accepted`, so the server can match it without re-deriving anything.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proto::{ResourceInfo, version_marker};

version_marker!(X402Version2, 2);

/// Signed payment sent to a v2 server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload<TPayload> {
    pub x402_version: X402Version2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,
    /// The accepts entry being paid, as received.
    pub accepted: Value,
    pub payload: TPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_echoes_accepted_verbatim() {
        let accepted = json!({
            "scheme": "exact",
            "network": "eip155:84532",
            "amount": "1000",
            "extra": {"name": "USDC", "version": "2", "vendorField": [1, 2]}
        });
        let envelope = PaymentPayload {
            x402_version: X402Version2,
            resource: Some(ResourceInfo::from_url("https://x.test/paid")),
            accepted: accepted.clone(),
            payload: json!({"transaction": "AQID"}),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["x402Version"], json!(2));
        assert_eq!(json["accepted"], accepted);
        assert_eq!(json["resource"], json!({"url": "https://x.test/paid"}));
    }
}
