//! Retry with exponential backoff for network reads
//!
//! Only failures classified as transient (rate limits, connection resets,
//! timeouts) are retried. Everything else is returned on first occurrence.
//! Transactions signed by the user are never routed through here.

use std::error::Error as StdError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SquidError, WalletError};
use crate::metrics;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Backoff multiplier for exponential growth
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay after a failed attempt (0-indexed)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Check if another attempt is allowed after `attempts` have been made
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts.max(1)
    }
}

/// Classifies errors for retry and reporting decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate limit, connection reset or timeout - retry with backoff
    Transient,
    /// The wallet or user declined to sign
    UserRejected,
    /// Account cannot pay for value or gas
    InsufficientFunds,
    /// Nonce too low/high or replacement underpriced
    NonceConflict,
    /// Anything else - do not retry
    Permanent,
}

/// Classify a node or wallet error message
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("user rejected")
        || error_lower.contains("user denied")
        || error_lower.contains("rejected by user")
        || error_lower.contains("action_rejected")
    {
        return ErrorClass::UserRejected;
    }

    if error_lower.contains("insufficient funds") || error_lower.contains("insufficient balance")
    {
        return ErrorClass::InsufficientFunds;
    }

    if error_lower.contains("nonce too low")
        || error_lower.contains("nonce too high")
        || error_lower.contains("already known")
        || error_lower.contains("replacement transaction underpriced")
    {
        return ErrorClass::NonceConflict;
    }

    // reverts are final whatever their data contains
    if error_lower.contains("execution reverted") {
        return ErrorClass::Permanent;
    }

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection reset")
        || error_lower.contains("connection closed")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("http 429")
        || error_lower.contains("status 429")
        || error_lower.contains("status code 429")
    {
        return ErrorClass::Transient;
    }

    ErrorClass::Permanent
}

/// Errors that can tell whether a retry may help
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for SquidError {
    fn is_transient(&self) -> bool {
        match self {
            SquidError::RateLimited { .. } => true,
            SquidError::Transport(e) => {
                e.is_timeout() || e.is_connect() || is_connection_reset(e)
            }
            _ => false,
        }
    }
}

impl Transient for WalletError {
    fn is_transient(&self) -> bool {
        match self {
            WalletError::Rpc(message) => classify_error(message) == ErrorClass::Transient,
            _ => false,
        }
    }
}

/// Walk the source chain looking for a reset or aborted socket
fn is_connection_reset(error: &(dyn StdError + 'static)) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
///
/// The closure receives the 0-indexed attempt number. The last error is
/// returned unchanged when attempts are exhausted.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    label: &'static str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let mut attempts = 0u32;

    loop {
        match operation(attempts).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;

                if !e.is_transient() {
                    debug!(operation = label, error = %e, "Permanent error - not retrying");
                    return Err(e);
                }

                if !config.should_retry(attempts) {
                    warn!(
                        operation = label,
                        attempts,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }

                let backoff = config.backoff_for_attempt(attempts - 1);
                metrics::RETRIES.with_label_values(&[label]).inc();
                warn!(
                    operation = label,
                    attempt = attempts,
                    max = config.max_attempts,
                    ?backoff,
                    error = %e,
                    "Retrying after backoff"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
