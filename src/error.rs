//! Error types for the bridge flow
//!
//! Each step has its own error so the caller can tell "the quote was bad"
//! apart from "the user declined" or "we never learned the outcome".

use thiserror::Error;

use crate::bridge::session::InvalidTransition;
use crate::types::TransferStatus;

/// Errors returned by the aggregator HTTP client
#[derive(Debug, Error)]
pub enum SquidError {
    #[error("aggregator rate limit hit (HTTP 429): {body}")]
    RateLimited { body: String },

    #[error("aggregator returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("aggregator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("aggregator response has no route")]
    MissingRoute,

    #[error("aggregator route is missing `{0}`")]
    IncompleteRoute(&'static str),

    #[error("failed to decode aggregator response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors returned by the Safe-deployment backend client
#[derive(Debug, Error)]
pub enum SafeBackendError {
    #[error("safe backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("safe backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode safe backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors returned by a [`ChainWallet`](crate::evm::ChainWallet)
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    /// Node or transport failure on a read or a submission
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The transaction was mined but reverted
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    /// The transaction could not be built from the given fields
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

/// Route quoting failures
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error(transparent)]
    Upstream(#[from] SquidError),

    #[error("route plan is unusable: missing {0}")]
    Incomplete(&'static str),

    #[error("failed to read source token decimals: {0}")]
    TokenMetadata(String),
}

/// Bridge transaction failures. Never retried.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("transaction rejected by signer: {0}")]
    UserRejected(String),

    #[error("insufficient funds for bridge transaction: {0}")]
    InsufficientFunds(String),

    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    #[error("bridge transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("bridge transaction is malformed: {0}")]
    InvalidTransaction(String),

    #[error("bridge transaction submission failed: {0}")]
    Submission(String),
}

/// Umbrella error for a bridge session
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("quote failed: {0}")]
    Quote(#[from] QuoteError),

    #[error("failed to read allowance: {0}")]
    Allowance(String),

    #[error("approval failed: {0}")]
    Approval(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("transfer status still unknown after {attempts} status polls")]
    MonitorTimeout { attempts: u32 },

    #[error("cross-chain transfer did not succeed: {status}")]
    TransferFailed { status: TransferStatus },

    #[error("a bridge session is already in flight")]
    SessionBusy,

    #[error("bridge session cancelled")]
    Cancelled,

    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

impl BridgeError {
    /// Short machine-readable label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Quote(_) => "quote",
            BridgeError::Allowance(_) => "allowance",
            BridgeError::Approval(_) => "approval",
            BridgeError::Execution(ExecutionError::UserRejected(_)) => "user_rejected",
            BridgeError::Execution(ExecutionError::InsufficientFunds(_)) => "insufficient_funds",
            BridgeError::Execution(_) => "execution",
            BridgeError::MonitorTimeout { .. } => "monitor_timeout",
            BridgeError::TransferFailed { .. } => "transfer_failed",
            BridgeError::SessionBusy => "session_busy",
            BridgeError::Cancelled => "cancelled",
            BridgeError::InvalidAmount { .. } => "invalid_amount",
            BridgeError::Transition(_) => "invalid_transition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SquidTransactionStatus;

    #[test]
    fn test_error_messages() {
        let err = BridgeError::MonitorTimeout { attempts: 120 };
        assert_eq!(
            err.to_string(),
            "transfer status still unknown after 120 status polls"
        );

        let err = BridgeError::TransferFailed {
            status: TransferStatus {
                squid_transaction_status: SquidTransactionStatus::NeedsGas,
                correlation_id: None,
                source_tx_id: "0xabc".to_string(),
                dest_tx_id: None,
            },
        };
        assert!(err.to_string().contains("needs_gas"));
        assert_eq!(err.kind(), "transfer_failed");
    }

    #[test]
    fn test_execution_kinds() {
        let rejected = BridgeError::from(ExecutionError::UserRejected("denied".into()));
        assert_eq!(rejected.kind(), "user_rejected");

        let funds = BridgeError::from(ExecutionError::InsufficientFunds("gas".into()));
        assert_eq!(funds.kind(), "insufficient_funds");

        let reverted = BridgeError::from(ExecutionError::Reverted {
            tx_hash: "0x1".into(),
        });
        assert_eq!(reverted.kind(), "execution");
    }
}
