use alloy_signer_local::PrivateKeySigner;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use x402_reqwest::{
    DEFAULT_REQUEST_TIMEOUT, HttpRequest, NegotiationStatus, Negotiator, ReqwestTransport,
    SigningContext,
};
use x402_types::scheme::client::X402Error;
use x402_types::scheme::selector::{PreferredNetwork, Preferences};
use x402_types::util::{Base64Bytes, RetryPolicy};

const BASE_SEPOLIA_USDC: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";
const BASE_USDC: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
const PAY_TO: &str = "0x209693Bc6afc0C5328bA36FaF03C514EF312287C";

fn evm_entry(network: &str, asset: &str) -> Value {
    json!({
        "scheme": "exact",
        "network": network,
        "asset": asset,
        "payTo": PAY_TO,
        "amount": "10000",
        "maxTimeoutSeconds": 60,
        "extra": {"name": "USDC", "version": "2"}
    })
}

fn solana_entry() -> Value {
    json!({
        "scheme": "exact",
        "network": "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        "asset": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        "payTo": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
        "amount": "10000",
        "extra": {"feePayer": "2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4"}
    })
}

fn payment_required(accepts: Vec<Value>) -> Value {
    json!({"x402Version": 2, "error": "payment required", "accepts": accepts})
}

fn negotiator(context: SigningContext) -> Negotiator {
    let transport = ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();
    Negotiator::new(transport, context).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
        factor: 2,
    })
}

fn evm_buyer() -> SigningContext {
    SigningContext::new().with_evm_signer(PrivateKeySigner::random())
}

fn request(server: &MockServer) -> HttpRequest {
    HttpRequest::get(format!("{}/paid", server.uri()).parse().unwrap())
}

async fn mount_unpaid_402(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/paid"))
        .respond_with(ResponseTemplate::new(402).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_free_resource_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Free);
    assert!(outcome.payload.is_none());
    assert!(outcome.attempts_tried.is_empty());
    assert_eq!(outcome.response.unwrap().body, b"hello");
}

#[tokio::test]
async fn test_single_evm_candidate_settles() {
    let server = MockServer::start().await;
    let entry = evm_entry("eip155:84532", BASE_SEPOLIA_USDC);
    let settlement = json!({"success": true, "transaction": "0xdeadbeef", "network": "eip155:84532"});
    Mock::given(method("GET"))
        .and(path("/paid"))
        .and(header_exists("Payment-Signature"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": "premium"}))
                .insert_header(
                    "Payment-Response",
                    Base64Bytes::encode_json(&settlement).unwrap().to_string(),
                ),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_unpaid_402(&server, payment_required(vec![entry.clone()])).await;

    let signer = PrivateKeySigner::random();
    let buyer = signer.address();
    let outcome = negotiator(SigningContext::new().with_evm_signer(signer))
        .negotiate(request(&server))
        .await
        .unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Settled);
    assert!(outcome.settled());
    assert_eq!(outcome.attempts_tried.len(), 1);
    assert_eq!(outcome.settled_requirement.as_ref(), Some(&outcome.attempts_tried[0]));
    assert!(outcome.last_error.is_none());
    assert_eq!(
        outcome.settlement.as_ref().and_then(|s| s.transaction.as_deref()),
        Some("0xdeadbeef")
    );
    assert_eq!(outcome.price_usd.map(|p| p.to_string()), Some("0.01".to_string()));

    let payload = outcome.payload.unwrap();
    assert_eq!(payload.header_name, "Payment-Signature");
    assert_eq!(payload.payer, buyer.to_checksum(None));

    let requests = server.received_requests().await.unwrap();
    let paid = requests
        .iter()
        .find(|r| r.headers.contains_key("payment-signature"))
        .unwrap();
    let header = paid.headers.get("payment-signature").unwrap().to_str().unwrap();
    let envelope: Value = Base64Bytes::from(header).decode_json().unwrap();
    assert_eq!(envelope["x402Version"], 2);
    assert_eq!(envelope["accepted"], entry);
    assert_eq!(envelope["resource"]["url"], format!("{}/paid", server.uri()));
    assert_eq!(envelope["payload"]["authorization"]["to"], PAY_TO);
    assert_eq!(envelope["payload"]["authorization"]["value"], "10000");
}

#[tokio::test]
async fn test_unpayable_candidate_falls_back_to_next() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .and(header_exists("Payment-Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_unpaid_402(
        &server,
        payment_required(vec![solana_entry(), evm_entry("eip155:8453", BASE_USDC)]),
    )
    .await;

    let outcome = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Settled);
    assert_eq!(outcome.attempts_tried.len(), 2);
    assert_eq!(outcome.attempts_tried[0].network, "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp");
    assert_eq!(outcome.settled_requirement.unwrap().network, "eip155:8453");
    assert_eq!(outcome.last_error.map(|e| e.code()), Some("UnsupportedNetwork"));
}

#[tokio::test]
async fn test_all_candidates_rejected_exhausts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .and(header_exists("Payment-Signature"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({"error": "insufficient_funds"})))
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    mount_unpaid_402(
        &server,
        payment_required(vec![
            evm_entry("eip155:84532", BASE_SEPOLIA_USDC),
            evm_entry("eip155:8453", BASE_USDC),
        ]),
    )
    .await;

    let outcome = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Exhausted);
    assert_eq!(outcome.attempts_tried.len(), 2);
    assert!(outcome.payload.is_none());
    let last_error = outcome.last_error.unwrap();
    assert_eq!(last_error.code(), "SettlementRejected");
    assert!(matches!(last_error, X402Error::SettlementRejected { status: 402, .. }));
}

#[tokio::test]
async fn test_first_failure_is_terminal_without_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .and(header_exists("Payment-Signature"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_unpaid_402(
        &server,
        payment_required(vec![
            evm_entry("eip155:84532", BASE_SEPOLIA_USDC),
            evm_entry("eip155:8453", BASE_USDC),
        ]),
    )
    .await;

    let outcome = negotiator(evm_buyer())
        .with_selector(Preferences::default().with_fallback(false))
        .negotiate(request(&server))
        .await
        .unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Exhausted);
    assert_eq!(outcome.attempts_tried.len(), 1);
    assert_eq!(outcome.last_error.map(|e| e.code()), Some("SettlementRejected"));
}

#[tokio::test]
async fn test_v1_server_gets_x_payment_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .and(header_exists("X-PAYMENT"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_unpaid_402(
        &server,
        json!({
            "x402Version": 1,
            "accepts": [{
                "scheme": "exact",
                "network": "base-sepolia",
                "asset": BASE_SEPOLIA_USDC,
                "payTo": PAY_TO,
                "maxAmountRequired": "10000",
                "resource": "https://api.example.com/paid"
            }]
        }),
    )
    .await;

    let outcome = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Settled);
    let payload = outcome.payload.unwrap();
    assert_eq!(payload.header_name, "X-PAYMENT");
    assert_eq!(payload.payload["x402Version"], 1);
    assert_eq!(payload.payload["network"], "base-sepolia");
}

#[tokio::test]
async fn test_payment_required_header_wins_over_body() {
    let server = MockServer::start().await;
    let header_doc = payment_required(vec![evm_entry("eip155:84532", BASE_SEPOLIA_USDC)]);
    Mock::given(method("GET"))
        .and(path("/paid"))
        .and(header_exists("Payment-Signature"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .respond_with(
            ResponseTemplate::new(402)
                .insert_header(
                    "Payment-Required",
                    Base64Bytes::encode_json(&header_doc).unwrap().to_string(),
                )
                .set_body_string("{}"),
        )
        .mount(&server)
        .await;

    let outcome = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Settled);
    assert_eq!(outcome.settled_requirement.unwrap().network, "eip155:84532");
}

#[tokio::test]
async fn test_rate_limited_first_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap();
    assert_eq!(outcome.status, NegotiationStatus::Free);
}

#[tokio::test]
async fn test_unexpected_status_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paid"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let error = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap_err();
    assert_eq!(
        error,
        X402Error::UnexpectedStatus {
            status: 404,
            body: "not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_malformed_402_is_surfaced() {
    let server = MockServer::start().await;
    mount_unpaid_402(&server, json!({"accepts": []})).await;

    let error = negotiator(evm_buyer()).negotiate(request(&server)).await.unwrap_err();
    assert_eq!(error.code(), "MalformedRequirements");
}

#[tokio::test]
async fn test_no_compatible_method_without_fallback() {
    let server = MockServer::start().await;
    mount_unpaid_402(
        &server,
        payment_required(vec![evm_entry("eip155:8453", BASE_USDC)]),
    )
    .await;

    let error = negotiator(evm_buyer())
        .with_selector(
            Preferences::default()
                .with_network(PreferredNetwork::Solana)
                .with_fallback(false),
        )
        .negotiate(request(&server))
        .await
        .unwrap_err();
    assert_eq!(error, X402Error::NoCompatibleMethod);
}

#[tokio::test]
async fn test_no_signer_is_a_precondition_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let error = negotiator(SigningContext::new())
        .negotiate(request(&server))
        .await
        .unwrap_err();
    assert_eq!(error, X402Error::NoSignerConfigured);
}

#[tokio::test]
async fn test_cancelled_negotiation_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(402))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let outcome = negotiator(evm_buyer())
        .with_cancellation_token(token)
        .negotiate(request(&server))
        .await
        .unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Cancelled);
    assert!(outcome.attempts_tried.is_empty());
    assert_eq!(outcome.last_error, Some(X402Error::Cancelled));
}

/// Rejects the payment and cancels the buyer's token, as a shutdown signal
/// arriving while the first paid request is in flight would.
struct RejectAndCancel(CancellationToken);

impl Respond for RejectAndCancel {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.0.cancel();
        ResponseTemplate::new(402).set_body_json(json!({"error": "insufficient_funds"}))
    }
}

#[tokio::test]
async fn test_cancellation_between_candidates_stops_the_loop() {
    let server = MockServer::start().await;
    let token = CancellationToken::new();
    Mock::given(method("GET"))
        .and(path("/paid"))
        .and(header_exists("Payment-Signature"))
        .respond_with(RejectAndCancel(token.clone()))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_unpaid_402(
        &server,
        payment_required(vec![
            evm_entry("eip155:84532", BASE_SEPOLIA_USDC),
            evm_entry("eip155:8453", BASE_USDC),
        ]),
    )
    .await;

    let outcome = negotiator(evm_buyer())
        .with_cancellation_token(token)
        .negotiate(request(&server))
        .await
        .unwrap();

    assert_eq!(outcome.status, NegotiationStatus::Cancelled);
    assert_eq!(outcome.attempts_tried.len(), 1);
    assert!(outcome.payload.is_none());
    assert_eq!(outcome.last_error.map(|e| e.code()), Some("SettlementRejected"));

    let requests = server.received_requests().await.unwrap();
    let paid = requests
        .iter()
        .filter(|r| r.headers.contains_key("payment-signature"))
        .count();
    assert_eq!(paid, 1);
}
