//! Bridge transaction submission
//!
//! Submits the plan's transaction exactly as quoted. Nothing here retries:
//! a second submission of a signed bridge transaction can move funds twice.

use tracing::{error, info};

use crate::error::{ExecutionError, WalletError};
use crate::evm::ChainWallet;
use crate::metrics;
use crate::retry::{classify_error, ErrorClass};
use crate::types::{RoutePlan, TxReceipt};

#[derive(Debug, Default)]
pub struct TransactionExecutor;

impl TransactionExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Sign and submit the plan's transaction, waiting until it is mined
    pub async fn execute(
        &self,
        plan: &RoutePlan,
        wallet: &dyn ChainWallet,
    ) -> Result<TxReceipt, ExecutionError> {
        let tx = &plan.transaction_request;
        info!(
            router = %tx.target,
            value = %tx.value,
            gas_limit = %tx.gas_limit,
            "Submitting bridge transaction"
        );

        match wallet.send_transaction(tx).await {
            Ok(receipt) => {
                metrics::BRIDGE_TXS_SUBMITTED
                    .with_label_values(&["success"])
                    .inc();
                info!(
                    tx_hash = %receipt.tx_hash,
                    block = ?receipt.block_number,
                    "Bridge transaction mined"
                );
                Ok(receipt)
            }
            Err(e) => {
                let err = execution_error(e);
                metrics::BRIDGE_TXS_SUBMITTED
                    .with_label_values(&["failed"])
                    .inc();
                error!(error = %err, "Bridge transaction failed");
                Err(err)
            }
        }
    }
}

/// Map a wallet failure onto the execution taxonomy
pub fn execution_error(error: WalletError) -> ExecutionError {
    match error {
        WalletError::Reverted { tx_hash } => ExecutionError::Reverted { tx_hash },
        WalletError::InvalidTransaction(message) => ExecutionError::InvalidTransaction(message),
        WalletError::Rpc(message) => match classify_error(&message) {
            ErrorClass::UserRejected => ExecutionError::UserRejected(message),
            ErrorClass::InsufficientFunds => ExecutionError::InsufficientFunds(message),
            ErrorClass::NonceConflict => ExecutionError::NonceConflict(message),
            ErrorClass::Transient | ErrorClass::Permanent => ExecutionError::Submission(message),
        },
    }
}
