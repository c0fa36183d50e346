//! The 402 negotiation: request, choose, pay, retry.
//!
//! ```text
//! REQUESTING ─2xx─▶ FREE
//!     │402
//!     ▼
//! NEGOTIATING ─(parse, order)─▶ SETTLING ─2xx─▶ SETTLED
//!                                   │ every candidate failed
//!                                   ▼
//!                               EXHAUSTED
//! ```
//!
//! Candidates are tried strictly one after another. Settlement spends funds, so no
//! two paid requests are ever in flight, and a paid request is never repeated: a
//! failure moves on to the next candidate instead.

use http::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use x402_types::proto::{
    PAYMENT_REQUIRED_HEADER, PAYMENT_RESPONSE_HEADER, PaymentRequired, PaymentRequirements,
    ResourceInfo, SettlementResponse, X_PAYMENT_RESPONSE_HEADER,
};
use x402_types::scheme::SchemeRegistry;
use x402_types::scheme::client::{SignedPayload, X402Error};
use x402_types::scheme::selector::{PaymentSelector, Preferences};
use x402_types::util::{Base64Bytes, RetryPolicy};

use crate::context::SigningContext;
use crate::outcome::{NegotiationOutcome, NegotiationStatus};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument, trace, warn};

/// Drives one resource request through payment negotiation.
///
/// ```rust,no_run
/// use alloy_signer_local::PrivateKeySigner;
/// use x402_reqwest::{HttpRequest, Negotiator, ReqwestTransport, SigningContext};
/// use x402_types::scheme::selector::{PreferredNetwork, Preferences};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ReqwestTransport::new(x402_reqwest::DEFAULT_REQUEST_TIMEOUT)?;
/// let context = SigningContext::new().with_evm_signer(PrivateKeySigner::random());
/// let negotiator = Negotiator::new(transport, context)
///     .with_selector(Preferences::default().with_network(PreferredNetwork::Base));
///
/// let outcome = negotiator
///     .negotiate(HttpRequest::get("https://api.example.com/paid".parse()?))
///     .await?;
/// println!("{:?}", outcome.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Negotiator<T = ReqwestTransport, S = Preferences> {
    transport: T,
    context: SigningContext,
    selector: S,
    retry_policy: RetryPolicy,
    cancellation: CancellationToken,
}

impl<T> Negotiator<T, Preferences> {
    pub fn new(transport: T, context: SigningContext) -> Self {
        Self {
            transport,
            context,
            selector: Preferences::default(),
            retry_policy: RetryPolicy::default(),
            cancellation: CancellationToken::new(),
        }
    }
}

impl<T, S> Negotiator<T, S> {
    pub fn with_selector<S2: PaymentSelector>(self, selector: S2) -> Negotiator<T, S2> {
        Negotiator {
            transport: self.transport,
            context: self.context,
            selector,
            retry_policy: self.retry_policy,
            cancellation: self.cancellation,
        }
    }

    /// Retry policy for the unauthenticated request. Paid requests are never retried.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Cancelling `token` stops the negotiation before the next candidate is built.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }
}

impl<T, S> Negotiator<T, S>
where
    T: HttpTransport,
    S: PaymentSelector,
{
    /// Requests `request.url`, paying for it if the server answers 402.
    ///
    /// Returns `Err` for failures that end the negotiation before any candidate is
    /// tried: no signer at all, an unexpected status, an unreadable 402 body, no
    /// candidate left after filtering, or a transport failure on the first request.
    /// Everything after that is reported through [`NegotiationOutcome`].
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "x402.reqwest.negotiate", skip_all, fields(url = %request.url), err)
    )]
    pub async fn negotiate(&self, request: HttpRequest) -> Result<NegotiationOutcome, X402Error> {
        if !self.context.has_signer() {
            return Err(X402Error::NoSignerConfigured);
        }

        let response = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => return Ok(cancelled(Vec::new(), None)),
            response = self.send_unpaid(&request) => response?,
        };

        if response.status.is_success() {
            #[cfg(feature = "telemetry")]
            trace!(status = %response.status, "No payment required, passing response through");
            return Ok(NegotiationOutcome::free(response));
        }
        if response.status != StatusCode::PAYMENT_REQUIRED {
            return Err(X402Error::UnexpectedStatus {
                status: response.status.as_u16(),
                body: response.text(),
            });
        }

        #[cfg(feature = "telemetry")]
        info!(url = %request.url, "Received 402 Payment Required, processing payment");

        let mut payment_required = parse_payment_required(&response)?;
        if payment_required.resource.is_none() {
            let url = self
                .context
                .resource_url()
                .map(str::to_string)
                .unwrap_or_else(|| request.url.to_string());
            payment_required.resource = Some(ResourceInfo::from_url(url));
        }

        let candidates = self.selector.order(&payment_required.accepts)?;
        #[cfg(feature = "telemetry")]
        debug!(
            candidates = ?candidates.iter().map(|r| r.id().to_string()).collect::<Vec<_>>(),
            allow_fallback = self.selector.allow_fallback(),
            "Ordered payment candidates"
        );

        let registry = self.context.registry_for(&payment_required);
        let mut attempts_tried = Vec::with_capacity(candidates.len());
        let mut last_error = None;

        for requirements in candidates {
            if self.cancellation.is_cancelled() {
                return Ok(cancelled(attempts_tried, last_error));
            }
            attempts_tried.push(requirements.id());

            #[cfg(feature = "telemetry")]
            debug!(candidate = %requirements.id(), "Attempting payment");

            match self
                .attempt(&registry, &payment_required, requirements, &request)
                .await
            {
                Ok((payload, response)) => {
                    #[cfg(feature = "telemetry")]
                    info!(candidate = %requirements.id(), status = %response.status, "Payment settled");
                    return Ok(NegotiationOutcome {
                        status: NegotiationStatus::Settled,
                        settlement: settlement_response(&response),
                        response: Some(response),
                        payload: Some(payload),
                        settled_requirement: Some(requirements.id()),
                        price_usd: requirements.usd_amount(),
                        last_error,
                        attempts_tried,
                    });
                }
                Err(X402Error::Cancelled) => {
                    return Ok(cancelled(attempts_tried, last_error));
                }
                Err(error) => {
                    #[cfg(feature = "telemetry")]
                    warn!(candidate = %requirements.id(), code = error.code(), error = %error, "Payment attempt failed");
                    last_error = Some(error);
                    if !self.selector.allow_fallback() {
                        break;
                    }
                }
            }
        }

        Ok(NegotiationOutcome {
            status: NegotiationStatus::Exhausted,
            response: None,
            payload: None,
            settled_requirement: None,
            price_usd: None,
            settlement: None,
            last_error,
            attempts_tried,
        })
    }

    /// Sends the request without payment, retrying on transient failures and 429.
    async fn send_unpaid(&self, request: &HttpRequest) -> Result<HttpResponse, X402Error> {
        self.retry_policy
            .retry(
                || self.transport.send(request),
                |outcome| match outcome {
                    Ok(response) => response.status == StatusCode::TOO_MANY_REQUESTS,
                    Err(error) => error.is_transient(),
                },
            )
            .await
            .map_err(|e| X402Error::TransportFailure(e.to_string()))
    }

    /// Builds a payload for one candidate and sends the paid request once.
    async fn attempt(
        &self,
        registry: &SchemeRegistry,
        payment_required: &PaymentRequired,
        requirements: &PaymentRequirements,
        request: &HttpRequest,
    ) -> Result<(SignedPayload, HttpResponse), X402Error> {
        let client = registry.resolve(requirements)?;
        let payload = client.build_payload(payment_required, requirements).await?;
        if self.cancellation.is_cancelled() {
            return Err(X402Error::Cancelled);
        }

        let header_value = payload.header_value()?;
        let paid_request = request
            .with_payment_header(payload.header_name, &header_value)
            .map_err(|e| X402Error::PaymentConstructionFailed(e.to_string()))?;
        let response = self
            .transport
            .send(&paid_request)
            .await
            .map_err(|e| X402Error::TransportFailure(e.to_string()))?;

        if response.status.is_success() {
            Ok((payload, response))
        } else {
            Err(X402Error::SettlementRejected {
                status: response.status.as_u16(),
                body: response.text(),
            })
        }
    }
}

fn cancelled(
    attempts_tried: Vec<x402_types::proto::RequirementId>,
    last_error: Option<X402Error>,
) -> NegotiationOutcome {
    #[cfg(feature = "telemetry")]
    info!(attempts = attempts_tried.len(), "Negotiation cancelled");
    NegotiationOutcome {
        status: NegotiationStatus::Cancelled,
        response: None,
        payload: None,
        settled_requirement: None,
        price_usd: None,
        settlement: None,
        last_error: last_error.or(Some(X402Error::Cancelled)),
        attempts_tried,
    }
}

/// Reads requirements from the `Payment-Required` header, falling back to the body.
///
/// A header that fails to decode is ignored in favour of the body.
pub fn parse_payment_required(response: &HttpResponse) -> Result<PaymentRequired, X402Error> {
    if let Some(header) = response.header(PAYMENT_REQUIRED_HEADER) {
        let from_header = Base64Bytes::from(header)
            .decode_json::<Value>()
            .map_err(|e| X402Error::InvalidJson(e.to_string()))
            .and_then(PaymentRequired::from_value);
        match from_header {
            Ok(payment_required) => return Ok(payment_required),
            Err(_error) => {
                #[cfg(feature = "telemetry")]
                debug!(error = %_error, "Ignoring unreadable Payment-Required header");
            }
        }
    }
    PaymentRequired::parse(&response.body)
}

/// Decodes the settlement report of a paid response, if it carries a readable one.
pub fn settlement_response(response: &HttpResponse) -> Option<SettlementResponse> {
    let header = response
        .header(PAYMENT_RESPONSE_HEADER)
        .or_else(|| response.header(X_PAYMENT_RESPONSE_HEADER))?;
    Base64Bytes::from(header).decode_json().ok()
}
