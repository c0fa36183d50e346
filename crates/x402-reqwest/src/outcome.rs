//! Result of one negotiation.

use serde::Serialize;
use x402_types::proto::{RequirementId, SettlementResponse};
use x402_types::scheme::client::{SignedPayload, X402Error};
use x402_types::util::money_amount::MoneyAmount;

use crate::transport::HttpResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationStatus {
    /// The resource answered without asking for payment.
    Free,
    /// A paid request succeeded.
    Settled,
    /// Every candidate was tried and none settled.
    Exhausted,
    /// Cancellation was observed before a candidate was built.
    Cancelled,
}

/// How a negotiation ended, and what it tried on the way.
///
/// `attempts_tried` lists every candidate that reached the build step, in order.
/// `last_error` holds the failure of the final unsuccessful attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationOutcome {
    pub status: NegotiationStatus,
    pub response: Option<HttpResponse>,
    pub payload: Option<SignedPayload>,
    pub settled_requirement: Option<RequirementId>,
    /// Price of the settled requirement in USD, when it was paid in USDC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<MoneyAmount>,
    pub settlement: Option<SettlementResponse>,
    pub last_error: Option<X402Error>,
    pub attempts_tried: Vec<RequirementId>,
}

impl NegotiationOutcome {
    pub fn free(response: HttpResponse) -> Self {
        Self {
            status: NegotiationStatus::Free,
            response: Some(response),
            payload: None,
            settled_requirement: None,
            price_usd: None,
            settlement: None,
            last_error: None,
            attempts_tried: Vec::new(),
        }
    }

    pub fn settled(&self) -> bool {
        self.status == NegotiationStatus::Settled
    }

    /// Free or settled: the caller holds the resource.
    pub fn is_success(&self) -> bool {
        matches!(self.status, NegotiationStatus::Free | NegotiationStatus::Settled)
    }
}
