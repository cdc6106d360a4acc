//! Squid Bridge - Library interface
//!
//! Cross-chain transfers through a bridge aggregator: quote a route, make sure
//! the router may spend the source token, submit the bridge transaction, then
//! follow the transfer until it lands on the destination chain.
//!
//! ## Modules
//!
//! - `bridge` - Quoter, allowance manager, executor, status monitor and the
//!   orchestrator that sequences them
//! - `squid` - Aggregator HTTP client
//! - `evm` - ERC20 bindings, read-only client and signing wallet
//! - `safe` - Safe-deployment backend client
//! - `api` - Health, metrics and balance endpoints
//! - `config` - Environment configuration
//!
//! Re-exports internal modules for use in integration tests.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod evm;
pub mod metrics;
pub mod retry;
pub mod safe;
pub mod squid;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{BridgeEvent, BridgeOrchestrator, BridgeParams, BridgeSession, SessionState};
pub use config::Config;
pub use error::{BridgeError, ExecutionError, QuoteError, SquidError, WalletError};
pub use squid::SquidClient;
pub use types::{RoutePlan, RouteRequest, SquidTransactionStatus, TransferStatus};
