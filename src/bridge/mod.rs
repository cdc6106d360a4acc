//! Bridge flow
//!
//! ## Submodules
//!
//! - `quoter` - Route quoting with retries
//! - `allowance` - Allowance reads and exact-amount approvals
//! - `executor` - Bridge transaction submission
//! - `monitor` - Cross-chain status polling
//! - `session` - Session state value and transitions
//! - `orchestrator` - Sequences the steps behind a single-flight guard

pub mod allowance;
pub mod executor;
pub mod monitor;
pub mod orchestrator;
pub mod quoter;
pub mod session;

pub use allowance::AllowanceManager;
pub use executor::{execution_error, TransactionExecutor};
pub use monitor::{MonitorConfig, StatusMonitor, StatusObserver, StatusSource};
pub use orchestrator::{BridgeEvent, BridgeOrchestrator, BridgeParams};
pub use quoter::{RouteQuoter, RouteSource};
pub use session::{BridgeSession, InvalidTransition, SessionEvent, SessionState};
