//! Bridge session state machine
//!
//! A [`BridgeSession`] is a plain value. [`BridgeSession::apply`] returns the
//! next session for an event, so the transition table can be exercised without
//! any network collaborator.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::error::BridgeError;
use crate::types::{RoutePlan, TransferStatus, TxReceipt};

/// Where a bridge attempt is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Quoting,
    Approving,
    Executing,
    Monitoring,
    Success,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Success | SessionState::Failed)
    }

    /// Whether a step is running (neither idle nor terminal)
    pub fn is_in_flight(self) -> bool {
        !matches!(self, SessionState::Idle) && !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Quoting => "quoting",
            SessionState::Approving => "approving",
            SessionState::Executing => "executing",
            SessionState::Monitoring => "monitoring",
            SessionState::Success => "success",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Caller starts a new attempt
    Start,
    /// The quoter returned a plan
    PlanReceived(RoutePlan),
    /// Allowance covers the transfer, with the approval receipt if one was needed
    AllowanceReady(Option<TxReceipt>),
    /// The bridge transaction was mined on the source chain
    Submitted(TxReceipt),
    /// The monitor reached a terminal status
    Terminal(TransferStatus),
    /// A step raised an error
    Error(String),
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::PlanReceived(_) => "plan_received",
            SessionEvent::AllowanceReady(_) => "allowance_ready",
            SessionEvent::Submitted(_) => "submitted",
            SessionEvent::Terminal(_) => "terminal",
            SessionEvent::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition from {from} on {event}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub event: &'static str,
}

/// State of one bridge attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeSession {
    pub state: SessionState,
    pub plan: Option<RoutePlan>,
    pub approval: Option<TxReceipt>,
    pub source_tx_id: Option<String>,
    pub final_status: Option<TransferStatus>,
    pub last_error: Option<String>,
}

impl Default for BridgeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            plan: None,
            approval: None,
            source_tx_id: None,
            final_status: None,
            last_error: None,
        }
    }

    /// Compute the session that follows `event`
    pub fn apply(&self, event: SessionEvent) -> Result<BridgeSession, InvalidTransition> {
        let invalid = InvalidTransition {
            from: self.state,
            event: event.name(),
        };

        match (self.state, event) {
            (SessionState::Idle | SessionState::Success | SessionState::Failed, SessionEvent::Start) => {
                Ok(BridgeSession {
                    state: SessionState::Quoting,
                    ..BridgeSession::new()
                })
            }
            (SessionState::Quoting, SessionEvent::PlanReceived(plan)) => Ok(BridgeSession {
                state: SessionState::Approving,
                plan: Some(plan),
                ..self.clone()
            }),
            (SessionState::Approving, SessionEvent::AllowanceReady(approval)) => {
                Ok(BridgeSession {
                    state: SessionState::Executing,
                    approval,
                    ..self.clone()
                })
            }
            (SessionState::Executing, SessionEvent::Submitted(receipt)) => Ok(BridgeSession {
                state: SessionState::Monitoring,
                source_tx_id: Some(receipt.tx_hash),
                ..self.clone()
            }),
            (SessionState::Monitoring, SessionEvent::Terminal(status)) if status.is_terminal() => {
                if status.squid_transaction_status.is_success() {
                    Ok(BridgeSession {
                        state: SessionState::Success,
                        final_status: Some(status),
                        ..self.clone()
                    })
                } else {
                    let error = BridgeError::TransferFailed {
                        status: status.clone(),
                    };
                    Ok(BridgeSession {
                        state: SessionState::Failed,
                        final_status: Some(status),
                        last_error: Some(error.to_string()),
                        ..self.clone()
                    })
                }
            }
            (state, SessionEvent::Error(message)) if state.is_in_flight() => Ok(self.fail(message)),
            _ => Err(invalid),
        }
    }

    /// Move to `failed` from any state, recording `message`
    pub fn fail(&self, message: impl Into<String>) -> BridgeSession {
        BridgeSession {
            state: SessionState::Failed,
            last_error: Some(message.into()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_plan, sample_request};
    use crate::types::SquidTransactionStatus;

    fn status(kind: SquidTransactionStatus) -> TransferStatus {
        TransferStatus {
            squid_transaction_status: kind,
            correlation_id: Some("req-1".to_string()),
            source_tx_id: "0xsource".to_string(),
            dest_tx_id: None,
        }
    }

    fn receipt(hash: &str) -> TxReceipt {
        TxReceipt {
            tx_hash: hash.to_string(),
            block_number: Some(1),
        }
    }

    fn monitoring_session() -> BridgeSession {
        BridgeSession::new()
            .apply(SessionEvent::Start)
            .unwrap()
            .apply(SessionEvent::PlanReceived(sample_plan(sample_request())))
            .unwrap()
            .apply(SessionEvent::AllowanceReady(None))
            .unwrap()
            .apply(SessionEvent::Submitted(receipt("0xsource")))
            .unwrap()
    }

    #[test]
    fn test_happy_path_transitions() {
        let session = monitoring_session();
        assert_eq!(session.state, SessionState::Monitoring);
        assert!(session.plan.is_some());
        assert_eq!(session.source_tx_id.as_deref(), Some("0xsource"));

        let done = session
            .apply(SessionEvent::Terminal(status(SquidTransactionStatus::Success)))
            .unwrap();
        assert_eq!(done.state, SessionState::Success);
        assert!(done.last_error.is_none());
    }

    #[test]
    fn test_non_success_terminal_fails_session() {
        for kind in [
            SquidTransactionStatus::PartialSuccess,
            SquidTransactionStatus::NeedsGas,
            SquidTransactionStatus::Failed,
        ] {
            let done = monitoring_session()
                .apply(SessionEvent::Terminal(status(kind)))
                .unwrap();
            assert_eq!(done.state, SessionState::Failed);
            assert!(done.last_error.unwrap().contains(kind.as_str()));
        }
    }

    #[test]
    fn test_pending_status_is_not_a_transition() {
        let err = monitoring_session()
            .apply(SessionEvent::Terminal(status(SquidTransactionStatus::Pending)))
            .unwrap_err();
        assert_eq!(err.from, SessionState::Monitoring);
    }

    #[test]
    fn test_error_from_any_step_fails() {
        let quoting = BridgeSession::new().apply(SessionEvent::Start).unwrap();
        let failed = quoting
            .apply(SessionEvent::Error("quote failed".to_string()))
            .unwrap();
        assert_eq!(failed.state, SessionState::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("quote failed"));

        // idle has no step to fail
        assert!(BridgeSession::new()
            .apply(SessionEvent::Error("x".to_string()))
            .is_err());
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let quoting = BridgeSession::new().apply(SessionEvent::Start).unwrap();
        assert!(quoting
            .apply(SessionEvent::Submitted(receipt("0x1")))
            .is_err());
        assert!(quoting.apply(SessionEvent::Start).is_err());
        assert!(BridgeSession::new()
            .apply(SessionEvent::AllowanceReady(None))
            .is_err());
    }

    #[test]
    fn test_restart_resets_session() {
        let failed = monitoring_session().fail("boom");
        let restarted = failed.apply(SessionEvent::Start).unwrap();
        assert_eq!(restarted.state, SessionState::Quoting);
        assert!(restarted.plan.is_none());
        assert!(restarted.source_tx_id.is_none());
        assert!(restarted.last_error.is_none());
    }
}
