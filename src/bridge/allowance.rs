//! ERC20 allowance checks and approvals
//!
//! Reads are retried with backoff. The approval itself is a signed
//! transaction and is submitted at most once per call.

use alloy::primitives::{Address, U256};
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::evm::ChainWallet;
use crate::metrics;
use crate::retry::{with_retry, RetryConfig};
use crate::types::TxReceipt;

pub struct AllowanceManager {
    retry: RetryConfig,
}

impl AllowanceManager {
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }

    /// Read `owner`'s allowance for `spender` on `token`
    pub async fn current_allowance(
        &self,
        wallet: &dyn ChainWallet,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, BridgeError> {
        with_retry(&self.retry, "allowance", |_| {
            wallet.allowance(token, owner, spender)
        })
        .await
        .map_err(|e| BridgeError::Allowance(e.to_string()))
    }

    /// Make sure `spender` may pull at least `required` of `token` from the
    /// wallet. Approves exactly `required` when the current allowance is
    /// short, waits for it to be mined, then reads the allowance again.
    ///
    /// Returns the approval receipt, or `None` when no approval was needed.
    pub async fn ensure_allowance(
        &self,
        wallet: &dyn ChainWallet,
        token: Address,
        spender: Address,
        required: U256,
    ) -> Result<Option<TxReceipt>, BridgeError> {
        let owner = wallet.address();
        let current = self
            .current_allowance(wallet, token, owner, spender)
            .await?;

        if current >= required {
            info!(
                token = %token,
                spender = %spender,
                allowance = %current,
                required = %required,
                "Allowance sufficient, skipping approval"
            );
            return Ok(None);
        }

        info!(
            token = %token,
            spender = %spender,
            allowance = %current,
            required = %required,
            "Allowance short, submitting approval"
        );

        let receipt = match wallet.approve(token, spender, required).await {
            Ok(receipt) => {
                metrics::APPROVALS_SUBMITTED
                    .with_label_values(&["success"])
                    .inc();
                receipt
            }
            Err(e) => {
                metrics::APPROVALS_SUBMITTED
                    .with_label_values(&["failed"])
                    .inc();
                warn!(token = %token, spender = %spender, error = %e, "Approval failed");
                return Err(BridgeError::Approval(e.to_string()));
            }
        };

        let updated = self
            .current_allowance(wallet, token, owner, spender)
            .await?;
        if updated < required {
            return Err(BridgeError::Approval(format!(
                "allowance is {} after approval {}, need {}",
                updated, receipt.tx_hash, required
            )));
        }

        info!(tx_hash = %receipt.tx_hash, allowance = %updated, "Approval confirmed");
        Ok(Some(receipt))
    }
}
