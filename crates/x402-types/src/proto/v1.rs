//! Protocol version 1 envelope.
//!
//! v1 servers identify the network by name (`"base-sepolia"`) and expect the payment
//! in the `X-PAYMENT` header as `{x402Version: 1, scheme, network, payload}`.

use serde::{Deserialize, Serialize};

use crate::proto::version_marker;

version_marker!(X402Version1, 1);

/// Signed payment sent to a v1 server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload<TPayload> {
    pub x402_version: X402Version1,
    pub scheme: String,
    /// The network exactly as the server named it.
    pub network: String,
    pub payload: TPayload,
}
