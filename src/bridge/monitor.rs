//! Cross-chain status monitoring
//!
//! After the source transaction is mined the aggregator needs a few seconds
//! to index it. The monitor waits a grace delay, then polls at a fixed
//! interval until a terminal status or the attempt limit.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, SquidError};
use crate::metrics;
use crate::types::{StatusQuery, TransferStatus};

/// Anything that can report the status of a cross-chain transfer
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, query: &StatusQuery) -> Result<TransferStatus, SquidError>;
}

/// Receives every status the monitor observes, pending ones included
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, status: &TransferStatus);
}

impl StatusObserver for UnboundedSender<TransferStatus> {
    fn on_status(&self, status: &TransferStatus) {
        // A dropped receiver only means nobody is listening
        let _ = self.send(status.clone());
    }
}

/// Status polling configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Wait before the first poll
    pub grace_delay: Duration,
    /// Wait between polls
    pub poll_interval: Duration,
    /// Polls before giving up
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            grace_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

pub struct StatusMonitor {
    source: Arc<dyn StatusSource>,
    config: MonitorConfig,
}

impl StatusMonitor {
    pub fn new(source: Arc<dyn StatusSource>, config: MonitorConfig) -> Self {
        Self { source, config }
    }

    /// Poll until the transfer reaches a terminal status.
    ///
    /// Poll errors are logged and the poll counts as pending. Returns
    /// [`BridgeError::MonitorTimeout`] once `max_attempts` polls have come back
    /// non-terminal, and [`BridgeError::Cancelled`] if `cancel` fires.
    pub async fn monitor(
        &self,
        query: &StatusQuery,
        observer: Option<&dyn StatusObserver>,
        cancel: &CancellationToken,
    ) -> Result<TransferStatus, BridgeError> {
        info!(
            tx_id = %query.transaction_id,
            request_id = ?query.request_id,
            grace_delay = ?self.config.grace_delay,
            "Waiting for aggregator to index transaction"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
            _ = tokio::time::sleep(self.config.grace_delay) => {}
        }

        let max_attempts = self.config.max_attempts;
        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(BridgeError::Cancelled);
            }

            match self.source.fetch_status(query).await {
                Ok(status) => {
                    metrics::STATUS_POLLS
                        .with_label_values(&[status.squid_transaction_status.as_str()])
                        .inc();
                    if let Some(observer) = observer {
                        observer.on_status(&status);
                    }
                    if status.is_terminal() {
                        info!(attempt, status = %status, "Transfer reached terminal status");
                        return Ok(status);
                    }
                    debug!(attempt, max_attempts, "Transfer still pending");
                }
                Err(e) => {
                    metrics::STATUS_POLLS.with_label_values(&["error"]).inc();
                    warn!(attempt, max_attempts, error = %e, "Status poll failed, treating as pending");
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        warn!(
            tx_id = %query.transaction_id,
            attempts = max_attempts,
            "Transfer status still unknown, giving up"
        );
        Err(BridgeError::MonitorTimeout {
            attempts: max_attempts,
        })
    }
}
