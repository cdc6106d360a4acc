//! End-to-end bridge flow against a mock aggregator
//!
//! The orchestrator talks to the real HTTP client; only the chain side is an
//! in-memory wallet.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::json;
use squid_bridge::bridge::{BridgeEvent, BridgeOrchestrator, BridgeParams, MonitorConfig};
use squid_bridge::error::WalletError;
use squid_bridge::evm::ChainWallet;
use squid_bridge::retry::RetryConfig;
use squid_bridge::types::{RouteTransaction, TxReceipt};
use squid_bridge::{SessionState, SquidClient};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROUTER: &str = "0xce16F69375520ab01377ce7B88f5BA8C48F8D666";
const SOURCE_TX: &str = "0x00000000000000000000000000000000000000000000000000000000000000bb";

#[derive(Default)]
struct RecordingWallet {
    allowance: Mutex<U256>,
    approvals: Mutex<Vec<(Address, U256)>>,
    submissions: Mutex<Vec<RouteTransaction>>,
}

#[async_trait]
impl ChainWallet for RecordingWallet {
    fn address(&self) -> Address {
        Address::repeat_byte(0x11)
    }

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, WalletError> {
        Ok(*self.allowance.lock().unwrap())
    }

    async fn token_decimals(&self, _token: Address) -> Result<u8, WalletError> {
        Ok(6)
    }

    async fn approve(
        &self,
        _token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, WalletError> {
        self.approvals.lock().unwrap().push((spender, amount));
        *self.allowance.lock().unwrap() = amount;
        Ok(TxReceipt {
            tx_hash: "0xaa".to_string(),
            block_number: Some(1),
        })
    }

    async fn send_transaction(&self, tx: &RouteTransaction) -> Result<TxReceipt, WalletError> {
        self.submissions.lock().unwrap().push(tx.clone());
        Ok(TxReceipt {
            tx_hash: SOURCE_TX.to_string(),
            block_number: Some(2),
        })
    }
}

fn params() -> BridgeParams {
    BridgeParams {
        source_chain: "42161".to_string(),
        dest_chain: "8453".to_string(),
        source_token: Address::repeat_byte(0xaa),
        dest_token: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
        recipient: None,
        slippage_bps: 100,
        fee: None,
        token_decimals: None,
    }
}

async fn mount_route(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/route"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req-e2e")
                .set_body_json(json!({
                    "route": {
                        "estimate": {
                            "fromAmount": "10000000",
                            "toAmount": "9990000",
                            "toAmountMin": "9890100",
                            "estimatedRouteDuration": 20
                        },
                        "transactionRequest": {
                            "target": ROUTER,
                            "data": "0x846a1bc6",
                            "value": "0",
                            "gasLimit": "400000"
                        }
                    }
                })),
        )
        .mount(server)
        .await;
}

fn fast_monitor() -> MonitorConfig {
    MonitorConfig {
        grace_delay: Duration::from_millis(10),
        poll_interval: Duration::from_millis(10),
        max_attempts: 5,
    }
}

#[tokio::test]
async fn test_bridge_flow_over_http() {
    let server = MockServer::start().await;
    mount_route(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .and(query_param("transactionId", SOURCE_TX))
        .and(query_param("requestId", "req-e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "req-e2e",
            "squidTransactionStatus": "success",
            "toChain": {"transactionId": "0xdest"}
        })))
        .mount(&server)
        .await;

    let client = Arc::new(SquidClient::new(&server.uri(), "integrator", Duration::from_secs(5)).unwrap());
    let wallet = Arc::new(RecordingWallet::default());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let orchestrator = BridgeOrchestrator::new(
        client.clone(),
        client,
        wallet.clone(),
        params(),
        RetryConfig::default(),
        fast_monitor(),
    )
    .with_events(tx);

    let session = orchestrator
        .start("10", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Success);
    assert_eq!(session.source_tx_id.as_deref(), Some(SOURCE_TX));
    let final_status = session.final_status.unwrap();
    assert_eq!(final_status.dest_tx_id.as_deref(), Some("0xdest"));
    assert_eq!(final_status.correlation_id.as_deref(), Some("req-e2e"));

    let approvals = wallet.approvals.lock().unwrap().clone();
    assert_eq!(
        approvals,
        vec![(Address::from_str(ROUTER).unwrap(), U256::from(10_000_000u64))]
    );
    assert_eq!(wallet.submissions.lock().unwrap().len(), 1);

    let mut states = Vec::new();
    let mut polls = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            BridgeEvent::State(state) => states.push(state),
            BridgeEvent::Status(_) => polls += 1,
        }
    }
    assert_eq!(
        states,
        vec![
            SessionState::Quoting,
            SessionState::Approving,
            SessionState::Executing,
            SessionState::Monitoring,
            SessionState::Success,
        ]
    );
    // the unindexed poll reports pending, then success
    assert_eq!(polls, 2);
}

#[tokio::test]
async fn test_bridge_flow_monitor_timeout_is_not_a_failed_transfer() {
    let server = MockServer::start().await;
    mount_route(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "squidTransactionStatus": "ongoing"
        })))
        .mount(&server)
        .await;

    let client = Arc::new(SquidClient::new(&server.uri(), "integrator", Duration::from_secs(5)).unwrap());
    let wallet = Arc::new(RecordingWallet::default());
    let orchestrator = BridgeOrchestrator::new(
        client.clone(),
        client,
        wallet,
        params(),
        RetryConfig::default(),
        fast_monitor(),
    );

    let session = orchestrator
        .start("10", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Failed);
    assert!(session.final_status.is_none());
    assert!(session
        .last_error
        .unwrap()
        .contains("still unknown after 5 status polls"));
}
