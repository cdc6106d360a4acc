//! Bridge orchestrator
//!
//! Sequences quote, allowance, execution and monitoring for one transfer at a
//! time. A second `start` while a session is in flight is rejected without
//! touching the network.

use alloy::primitives::{Address, U256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::allowance::AllowanceManager;
use super::executor::TransactionExecutor;
use super::monitor::{MonitorConfig, StatusMonitor, StatusObserver, StatusSource};
use super::quoter::{RouteQuoter, RouteSource};
use super::session::{BridgeSession, SessionEvent, SessionState};
use crate::error::{BridgeError, QuoteError};
use crate::evm::{to_token_units, ChainWallet};
use crate::metrics;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{IntegratorFee, RouteRequest, StatusQuery, TransferStatus, NATIVE_TOKEN};

/// Decimals of every EVM chain's native asset
const NATIVE_DECIMALS: u8 = 18;

/// Fixed parameters of the transfers an orchestrator runs
#[derive(Debug, Clone)]
pub struct BridgeParams {
    pub source_chain: String,
    pub dest_chain: String,
    pub source_token: Address,
    pub dest_token: String,
    /// Destination recipient; defaults to the signer address
    pub recipient: Option<String>,
    pub slippage_bps: u32,
    pub fee: Option<IntegratorFee>,
    /// Skip the on-chain `decimals()` read
    pub token_decimals: Option<u8>,
}

impl BridgeParams {
    /// Build the route request for `amount` smallest units sent by `sender`
    pub fn route_request(&self, amount: U256, sender: Address) -> RouteRequest {
        RouteRequest {
            source_chain: self.source_chain.clone(),
            dest_chain: self.dest_chain.clone(),
            source_token: self.source_token,
            dest_token: self.dest_token.clone(),
            amount,
            sender,
            recipient: self
                .recipient
                .clone()
                .unwrap_or_else(|| sender.to_checksum(None)),
            slippage_bps: self.slippage_bps,
            fee: self.fee,
        }
    }
}

/// Progress published while a session runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The session entered a state
    State(SessionState),
    /// A status poll succeeded
    Status(TransferStatus),
}

impl StatusObserver for UnboundedSender<BridgeEvent> {
    fn on_status(&self, status: &TransferStatus) {
        let _ = self.send(BridgeEvent::Status(status.clone()));
    }
}

/// Holds the busy flag for the lifetime of one session
struct FlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(busy: &'a AtomicBool) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        metrics::SESSION_IN_FLIGHT.set(1.0);
        Some(Self { busy })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        metrics::SESSION_IN_FLIGHT.set(0.0);
        self.busy.store(false, Ordering::Release);
    }
}

/// Runs bridge sessions one at a time
pub struct BridgeOrchestrator {
    quoter: RouteQuoter,
    allowance: AllowanceManager,
    executor: TransactionExecutor,
    monitor: StatusMonitor,
    wallet: Arc<dyn ChainWallet>,
    params: BridgeParams,
    retry: RetryConfig,
    busy: AtomicBool,
    current: Mutex<BridgeSession>,
    events: Option<UnboundedSender<BridgeEvent>>,
}

impl BridgeOrchestrator {
    pub fn new(
        routes: Arc<dyn RouteSource>,
        statuses: Arc<dyn StatusSource>,
        wallet: Arc<dyn ChainWallet>,
        params: BridgeParams,
        retry: RetryConfig,
        monitor: MonitorConfig,
    ) -> Self {
        Self {
            quoter: RouteQuoter::new(routes, retry.clone()),
            allowance: AllowanceManager::new(retry.clone()),
            executor: TransactionExecutor::new(),
            monitor: StatusMonitor::new(statuses, monitor),
            wallet,
            params,
            retry,
            busy: AtomicBool::new(false),
            current: Mutex::new(BridgeSession::new()),
            events: None,
        }
    }

    /// Publish state entries and status polls on `events`
    pub fn with_events(mut self, events: UnboundedSender<BridgeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn params(&self) -> &BridgeParams {
        &self.params
    }

    /// Whether a session is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of the latest session
    pub fn session(&self) -> BridgeSession {
        self.current
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Run one transfer of `amount` (a decimal string in whole tokens).
    ///
    /// Returns the final session. Step failures end in a `failed` session
    /// with `last_error` set; only [`BridgeError::SessionBusy`] is returned
    /// as an error, before any network call.
    pub async fn start(
        &self,
        amount: &str,
        cancel: &CancellationToken,
    ) -> Result<BridgeSession, BridgeError> {
        let _guard = FlightGuard::acquire(&self.busy).ok_or(BridgeError::SessionBusy)?;
        let started = Instant::now();

        let mut session = BridgeSession::new();
        let kind = match self.run(amount, cancel, &mut session).await {
            Ok(()) if session.state == SessionState::Success => "none",
            Ok(()) => "transfer_failed",
            Err(e) => {
                error!(state = %session.state, error = %e, "Bridge session failed");
                session = session
                    .apply(SessionEvent::Error(e.to_string()))
                    .unwrap_or_else(|_| session.fail(e.to_string()));
                self.publish(&session);
                e.kind()
            }
        };

        metrics::SESSIONS
            .with_label_values(&[session.state.as_str(), kind])
            .inc();
        metrics::SESSION_DURATION.observe(started.elapsed().as_secs_f64());

        info!(
            state = %session.state,
            source_tx = ?session.source_tx_id,
            last_error = ?session.last_error,
            "Bridge session finished"
        );
        Ok(session)
    }

    async fn run(
        &self,
        amount: &str,
        cancel: &CancellationToken,
        session: &mut BridgeSession,
    ) -> Result<(), BridgeError> {
        self.advance(session, SessionEvent::Start)?;
        let request = self.prepare_request(amount).await?;
        let plan = self.quoter.quote(&request).await?;
        checkpoint(cancel)?;

        self.advance(session, SessionEvent::PlanReceived(plan.clone()))?;
        let approval = if request.is_native() {
            info!("Native source asset, no allowance required");
            None
        } else {
            let spender = plan
                .spender()
                .ok_or(QuoteError::Incomplete("transactionRequest.target"))?;
            self.allowance
                .ensure_allowance(
                    self.wallet.as_ref(),
                    request.source_token,
                    spender,
                    plan.required_allowance(),
                )
                .await?
        };
        checkpoint(cancel)?;

        self.advance(session, SessionEvent::AllowanceReady(approval))?;
        let receipt = self.executor.execute(&plan, self.wallet.as_ref()).await?;

        self.advance(session, SessionEvent::Submitted(receipt.clone()))?;
        let query = StatusQuery::for_plan(&plan, &receipt.tx_hash);
        let observer = self.events.as_ref().map(|tx| tx as &dyn StatusObserver);
        let status = self.monitor.monitor(&query, observer, cancel).await?;

        self.advance(session, SessionEvent::Terminal(status))?;
        Ok(())
    }

    /// Convert `amount` to smallest units and build the route request
    async fn prepare_request(&self, amount: &str) -> Result<RouteRequest, BridgeError> {
        let token = self.params.source_token;
        let decimals = match self.params.token_decimals {
            Some(decimals) => decimals,
            None if token == NATIVE_TOKEN => NATIVE_DECIMALS,
            None => with_retry(&self.retry, "decimals", |_| self.wallet.token_decimals(token))
                .await
                .map_err(|e| QuoteError::TokenMetadata(e.to_string()))?,
        };

        let units = to_token_units(amount, decimals).map_err(|e| BridgeError::InvalidAmount {
            amount: amount.to_string(),
            reason: e.to_string(),
        })?;
        if units.is_zero() {
            return Err(BridgeError::InvalidAmount {
                amount: amount.to_string(),
                reason: "amount must be greater than zero".to_string(),
            });
        }

        info!(amount = %amount, decimals, units = %units, "Starting bridge session");
        Ok(self.params.route_request(units, self.wallet.address()))
    }

    fn advance(&self, session: &mut BridgeSession, event: SessionEvent) -> Result<(), BridgeError> {
        *session = session.apply(event)?;
        self.publish(session);
        Ok(())
    }

    fn publish(&self, session: &BridgeSession) {
        info!(state = %session.state, "Bridge session state");
        match self.current.lock() {
            Ok(mut current) => *current = session.clone(),
            Err(poisoned) => *poisoned.into_inner() = session.clone(),
        }
        if let Some(events) = &self.events {
            let _ = events.send(BridgeEvent::State(session.state));
        }
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), BridgeError> {
    if cancel.is_cancelled() {
        return Err(BridgeError::Cancelled);
    }
    Ok(())
}
