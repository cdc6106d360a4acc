//! Aggregator client tests against a mock HTTP server
//!
//! Verify request shape (headers, body, query), correlation id capture, and
//! the mapping of HTTP outcomes onto route plans, statuses and errors.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde_json::json;
use squid_bridge::bridge::{MonitorConfig, RouteQuoter, StatusMonitor};
use squid_bridge::retry::RetryConfig;
use squid_bridge::squid::{INTEGRATOR_HEADER, REQUEST_ID_HEADER};
use squid_bridge::types::{RouteRequest, StatusQuery, TransferStatus};
use squid_bridge::{SquidClient, SquidError, SquidTransactionStatus};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const INTEGRATOR_ID: &str = "test-integrator";
const ROUTER: &str = "0xce16F69375520ab01377ce7B88f5BA8C48F8D666";

fn client(server: &MockServer) -> SquidClient {
    SquidClient::new(&server.uri(), INTEGRATOR_ID, Duration::from_secs(5)).unwrap()
}

fn request() -> RouteRequest {
    RouteRequest {
        source_chain: "42161".to_string(),
        dest_chain: "8453".to_string(),
        source_token: Address::repeat_byte(0xaa),
        dest_token: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
        amount: U256::from(10_000_000u64),
        sender: Address::repeat_byte(0x11),
        recipient: "0x2222222222222222222222222222222222222222".to_string(),
        slippage_bps: 100,
        fee: None,
    }
}

fn route_body() -> serde_json::Value {
    json!({
        "route": {
            "estimate": {
                "fromAmount": "10000000",
                "toAmount": "9990000",
                "toAmountMin": "9890100",
                "estimatedRouteDuration": 20,
                "feeCosts": [{"name": "Gas receiver fee", "amount": "12345"}],
                "gasCosts": [{"type": "executeCall", "amount": "54321", "gasLimit": "400000"}]
            },
            "transactionRequest": {
                "target": ROUTER,
                "data": "0x846a1bc6",
                "value": "12345",
                "gasLimit": "400000",
                "maxFeePerGas": "100000000",
                "maxPriorityFeePerGas": "1000000"
            }
        }
    })
}

fn status_query() -> StatusQuery {
    StatusQuery {
        transaction_id: "0xsource".to_string(),
        request_id: Some("req-42".to_string()),
        from_chain_id: "42161".to_string(),
        to_chain_id: "8453".to_string(),
    }
}

// ============================================================================
// ROUTE TESTS
// ============================================================================

#[tokio::test]
async fn test_route_request_shape_and_correlation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .and(header(INTEGRATOR_HEADER, INTEGRATOR_ID))
        .and(body_partial_json(json!({
            "fromChain": "42161",
            "toChain": "8453",
            "fromAmount": "10000000",
            "toToken": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            "slippage": 1.0
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(REQUEST_ID_HEADER, "req-42")
                .set_body_json(route_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let plan = assert_ok!(client(&server).get_route(&request()).await);

    assert_eq!(plan.request_id.as_deref(), Some("req-42"));
    assert_eq!(plan.request, request());
    assert_eq!(plan.estimate.to_amount_min, "9890100");
    assert_eq!(plan.estimate.duration_seconds, 20);
    assert_eq!(plan.estimate.gas_costs[0].kind, "executeCall");
    assert_eq!(plan.transaction_request.target, ROUTER);
    assert_eq!(plan.transaction_request.value, "12345");
    assert_eq!(
        plan.transaction_request.max_priority_fee_per_gas.as_deref(),
        Some("1000000")
    );
}

#[tokio::test]
async fn test_route_without_route_field_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .mount(&server)
        .await;

    let err = assert_err!(client(&server).get_route(&request()).await);
    assert!(matches!(err, SquidError::MissingRoute));
}

#[tokio::test]
async fn test_route_without_transaction_request_is_error() {
    let server = MockServer::start().await;
    let mut body = route_body();
    body["route"]
        .as_object_mut()
        .unwrap()
        .remove("transactionRequest");
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = assert_err!(client(&server).get_route(&request()).await);
    assert!(matches!(err, SquidError::IncompleteRoute("transactionRequest")));
}

#[tokio::test]
async fn test_route_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = assert_err!(client(&server).get_route(&request()).await);
    assert!(matches!(err, SquidError::RateLimited { ref body } if body == "slow down"));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad token"))
        .mount(&server)
        .await;

    let err = assert_err!(client(&server).get_route(&request()).await);
    assert!(matches!(err, SquidError::Http { status: 400, .. }));
}

#[tokio::test]
async fn test_quoter_retries_rate_limited_route() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .respond_with(ResponseTemplate::new(200).set_body_json(route_body()))
        .mount(&server)
        .await;

    let retry = RetryConfig {
        initial_delay: Duration::from_millis(10),
        ..RetryConfig::default()
    };
    let quoter = RouteQuoter::new(Arc::new(client(&server)), retry);

    let plan = assert_ok!(quoter.quote(&request()).await);
    assert_eq!(plan.transaction_request.target, ROUTER);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

// ============================================================================
// STATUS TESTS
// ============================================================================

#[tokio::test]
async fn test_status_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .and(header(INTEGRATOR_HEADER, INTEGRATOR_ID))
        .and(query_param("transactionId", "0xsource"))
        .and(query_param("requestId", "req-42"))
        .and(query_param("fromChainId", "42161"))
        .and(query_param("toChainId", "8453"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "req-42",
            "status": "destination_executed",
            "squidTransactionStatus": "success",
            "fromChain": {"transactionId": "0xsource"},
            "toChain": {"transactionId": "0xdest"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = assert_ok!(client(&server).get_status(&status_query()).await);

    assert_eq!(status.squid_transaction_status, SquidTransactionStatus::Success);
    assert_eq!(status.correlation_id.as_deref(), Some("req-42"));
    assert_eq!(status.dest_tx_id.as_deref(), Some("0xdest"));
}

#[tokio::test]
async fn test_status_not_indexed_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let status = assert_ok!(client(&server).get_status(&status_query()).await);

    assert_eq!(status, TransferStatus::pending(&status_query()));
}

#[tokio::test]
async fn test_status_unknown_value_is_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "squidTransactionStatus": "ongoing"
        })))
        .mount(&server)
        .await;

    let status = assert_ok!(client(&server).get_status(&status_query()).await);

    assert_eq!(status.squid_transaction_status, SquidTransactionStatus::Pending);
    assert_eq!(status.source_tx_id, "0xsource");
}

#[tokio::test]
async fn test_monitor_rides_out_unindexed_and_failing_polls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "squidTransactionStatus": "needs_gas"
        })))
        .mount(&server)
        .await;

    let monitor = StatusMonitor::new(
        Arc::new(client(&server)),
        MonitorConfig {
            grace_delay: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
            max_attempts: 10,
        },
    );
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<TransferStatus>();

    let status = assert_ok!(
        monitor
            .monitor(&status_query(), Some(&tx), &CancellationToken::new())
            .await
    );
    assert_eq!(status.squid_transaction_status, SquidTransactionStatus::NeedsGas);

    // the failed poll is swallowed and not reported
    drop(tx);
    let mut observed = Vec::new();
    while let Some(update) = rx.recv().await {
        observed.push(update.squid_transaction_status);
    }
    assert_eq!(
        observed,
        vec![
            SquidTransactionStatus::Pending,
            SquidTransactionStatus::NeedsGas
        ]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
