//! Testing Utilities Module
//!
//! In-memory collaborators for exercising the bridge flow without an
//! aggregator or a node:
//!
//! - [`ScriptedRouteSource`] - replays route responses in order
//! - [`ScriptedStatusSource`] - replays status responses, then repeats a fallback
//! - [`MockWallet`] - records approvals and submissions, tracks allowances

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::bridge::{RouteSource, StatusSource};
use crate::error::{SquidError, WalletError};
use crate::evm::ChainWallet;
use crate::types::{
    RouteEstimate, RoutePlan, RouteRequest, RouteTransaction, SquidTransactionStatus,
    StatusQuery, TransferStatus, TxReceipt,
};

/// Router contract used as the spender in sample plans
pub const SAMPLE_ROUTER: &str = "0xce16F69375520ab01377ce7B88f5BA8C48F8D666";

/// A 10 USDC Arbitrum -> Base request
pub fn sample_request() -> RouteRequest {
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

/// A complete plan for `request`
pub fn sample_plan(request: RouteRequest) -> RoutePlan {
    RoutePlan {
        estimate: RouteEstimate {
            from_amount: request.amount.to_string(),
            to_amount: request.amount.to_string(),
            to_amount_min: request.amount.to_string(),
            duration_seconds: 20,
            fee_costs: vec![],
            gas_costs: vec![],
        },
        transaction_request: RouteTransaction {
            target: SAMPLE_ROUTER.to_string(),
            data: "0x846a1bc6".to_string(),
            value: "0".to_string(),
            gas_limit: "400000".to_string(),
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        },
        request,
        request_id: Some("req-1".to_string()),
    }
}

// ============================================================================
// Route source
// ============================================================================

/// Scripted reply for [`ScriptedRouteSource`]
pub enum RouteReply {
    /// Return a complete plan for the incoming request
    Plan,
    /// Return this plan, ignoring the incoming request
    Fixed(RoutePlan),
    Error(SquidError),
}

/// Replays route replies in order; answers `Plan` once the script runs out
#[derive(Default)]
pub struct ScriptedRouteSource {
    replies: Mutex<VecDeque<RouteReply>>,
    calls: AtomicU32,
}

impl ScriptedRouteSource {
    pub fn new(replies: Vec<RouteReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteSource for ScriptedRouteSource {
    async fn fetch_route(&self, request: &RouteRequest) -> Result<RoutePlan, SquidError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .map(|mut replies| replies.pop_front())
            .unwrap_or(None)
            .unwrap_or(RouteReply::Plan);
        match reply {
            RouteReply::Plan => Ok(sample_plan(request.clone())),
            RouteReply::Fixed(plan) => Ok(plan),
            RouteReply::Error(e) => Err(e),
        }
    }
}

// ============================================================================
// Status source
// ============================================================================

/// Replays statuses in order, then answers `fallback` forever
pub struct ScriptedStatusSource {
    replies: Mutex<VecDeque<Result<SquidTransactionStatus, SquidError>>>,
    fallback: SquidTransactionStatus,
    polls: AtomicU32,
}

impl ScriptedStatusSource {
    pub fn new(
        replies: Vec<Result<SquidTransactionStatus, SquidError>>,
        fallback: SquidTransactionStatus,
    ) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            polls: AtomicU32::new(0),
        }
    }

    /// Every poll answers `status`
    pub fn always(status: SquidTransactionStatus) -> Self {
        Self::new(vec![], status)
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatusSource {
    async fn fetch_status(&self, query: &StatusQuery) -> Result<TransferStatus, SquidError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .map(|mut replies| replies.pop_front())
            .unwrap_or(None)
            .unwrap_or(Ok(self.fallback));

        reply.map(|kind| TransferStatus {
            squid_transaction_status: kind,
            correlation_id: query.request_id.clone(),
            source_tx_id: query.transaction_id.clone(),
            dest_tx_id: kind.is_success().then(|| "0xdestination".to_string()),
        })
    }
}

// ============================================================================
// Wallet
// ============================================================================

/// Recorded approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalCall {
    pub token: Address,
    pub spender: Address,
    pub amount: U256,
}

/// In-memory wallet that records every write
pub struct MockWallet {
    address: Address,
    decimals: u8,
    allowances: Mutex<HashMap<(Address, Address), U256>>,
    approvals: Mutex<Vec<ApprovalCall>>,
    submissions: Mutex<Vec<RouteTransaction>>,
    allowance_reads: AtomicU32,
    approve_attempts: AtomicU32,
    send_attempts: AtomicU32,
    /// When false, approvals are mined but do not change the allowance
    approvals_take_effect: bool,
    approve_error: Option<WalletError>,
    send_error: Option<WalletError>,
    read_errors: Mutex<VecDeque<WalletError>>,
    tx_counter: AtomicU32,
}

impl MockWallet {
    pub fn new(address: Address, decimals: u8) -> Self {
        Self {
            address,
            decimals,
            allowances: Mutex::new(HashMap::new()),
            approvals: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            allowance_reads: AtomicU32::new(0),
            approve_attempts: AtomicU32::new(0),
            send_attempts: AtomicU32::new(0),
            approvals_take_effect: true,
            approve_error: None,
            send_error: None,
            read_errors: Mutex::new(VecDeque::new()),
            tx_counter: AtomicU32::new(0),
        }
    }

    pub fn with_allowance(self, token: Address, spender: Address, amount: U256) -> Self {
        if let Ok(mut allowances) = self.allowances.lock() {
            allowances.insert((token, spender), amount);
        }
        self
    }

    pub fn with_ineffective_approvals(mut self) -> Self {
        self.approvals_take_effect = false;
        self
    }

    pub fn with_approve_error(mut self, error: WalletError) -> Self {
        self.approve_error = Some(error);
        self
    }

    pub fn with_send_error(mut self, error: WalletError) -> Self {
        self.send_error = Some(error);
        self
    }

    /// Fail the next allowance reads with these errors, in order
    pub fn with_read_errors(self, errors: Vec<WalletError>) -> Self {
        if let Ok(mut queue) = self.read_errors.lock() {
            queue.extend(errors);
        }
        self
    }

    pub fn approvals(&self) -> Vec<ApprovalCall> {
        self.approvals.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn submissions(&self) -> Vec<RouteTransaction> {
        self.submissions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn allowance_reads(&self) -> u32 {
        self.allowance_reads.load(Ordering::SeqCst)
    }

    /// Approve calls, including failed ones
    pub fn approve_attempts(&self) -> u32 {
        self.approve_attempts.load(Ordering::SeqCst)
    }

    /// Send calls, including failed ones
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }

    fn next_receipt(&self) -> TxReceipt {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        TxReceipt {
            tx_hash: format!("0x{:064x}", n),
            block_number: Some(100 + n as u64),
        }
    }
}

#[async_trait]
impl ChainWallet for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn allowance(
        &self,
        token: Address,
        _owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError> {
        self.allowance_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.read_errors.lock().ok().and_then(|mut q| q.pop_front()) {
            return Err(error);
        }
        Ok(self
            .allowances
            .lock()
            .ok()
            .and_then(|a| a.get(&(token, spender)).copied())
            .unwrap_or(U256::ZERO))
    }

    async fn token_decimals(&self, _token: Address) -> Result<u8, WalletError> {
        Ok(self.decimals)
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, WalletError> {
        self.approve_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.approve_error {
            return Err(error.clone());
        }
        if let Ok(mut approvals) = self.approvals.lock() {
            approvals.push(ApprovalCall {
                token,
                spender,
                amount,
            });
        }
        if self.approvals_take_effect {
            if let Ok(mut allowances) = self.allowances.lock() {
                allowances.insert((token, spender), amount);
            }
        }
        Ok(self.next_receipt())
    }

    async fn send_transaction(&self, tx: &RouteTransaction) -> Result<TxReceipt, WalletError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.send_error {
            return Err(error.clone());
        }
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push(tx.clone());
        }
        Ok(self.next_receipt())
    }
}
