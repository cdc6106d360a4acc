//! Signing wallet
//!
//! [`ChainWallet`] is the signer context handed to the allowance manager and
//! the executor. [`EvmWallet`] implements it with a local private key; every
//! write waits for the transaction to be mined before returning.

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::client::EvmClient;
use super::contracts::ERC20;
use crate::error::WalletError;
use crate::types::{RouteTransaction, TxReceipt};

/// Default time to wait for a submitted transaction to be mined
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Signer context for allowance reads, approvals and bridge submissions
#[async_trait]
pub trait ChainWallet: Send + Sync {
    /// Address that signs and pays
    fn address(&self) -> Address;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError>;

    async fn token_decimals(&self, token: Address) -> Result<u8, WalletError>;

    /// Approve `spender` for exactly `amount` and wait until mined
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, WalletError>;

    /// Submit `tx` unchanged and wait until mined
    async fn send_transaction(&self, tx: &RouteTransaction) -> Result<TxReceipt, WalletError>;
}

/// Local-key EVM wallet
pub struct EvmWallet {
    reader: EvmClient,
    rpc_url: url::Url,
    signer: PrivateKeySigner,
    receipt_timeout: Duration,
}

impl EvmWallet {
    /// Create a wallet from an RPC URL and a 0x-prefixed private key
    pub fn new(rpc_url: &str, chain_id: u64, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;
        let parsed_url: url::Url = rpc_url.parse().wrap_err("Invalid RPC URL")?;
        let reader = EvmClient::new(rpc_url, chain_id)?;

        info!(
            address = %signer.address(),
            chain_id = chain_id,
            "EVM wallet initialized"
        );

        Ok(Self {
            reader,
            rpc_url: parsed_url,
            signer,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.reader.chain_id
    }

    pub fn reader(&self) -> &EvmClient {
        &self.reader
    }

    /// Check a mined receipt and convert it
    fn finish(&self, receipt: TransactionReceipt) -> Result<TxReceipt, WalletError> {
        let tx_hash = format!("0x{:x}", receipt.transaction_hash);
        if !receipt.status() {
            return Err(WalletError::Reverted { tx_hash });
        }
        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number,
        })
    }
}

#[async_trait]
impl ChainWallet for EvmWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError> {
        self.reader.allowance(token, owner, spender).await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, WalletError> {
        self.reader.decimals(token).await
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, WalletError> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone());

        let contract = ERC20::new(token, &provider);

        debug!(token = %token, spender = %spender, amount = %amount, "Submitting approve");

        let pending_tx = contract
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| WalletError::Rpc(format!("Failed to send approve: {}", e)))?;

        let tx_hash = *pending_tx.tx_hash();
        info!(tx_hash = %tx_hash, "Approve sent, waiting for confirmation");

        let receipt = tokio::time::timeout(self.receipt_timeout, pending_tx.get_receipt())
            .await
            .map_err(|_| {
                WalletError::Rpc(format!(
                    "Approve {} not mined after {:?} (timed out)",
                    tx_hash, self.receipt_timeout
                ))
            })?
            .map_err(|e| WalletError::Rpc(format!("Failed to get receipt: {}", e)))?;

        self.finish(receipt)
    }

    async fn send_transaction(&self, tx: &RouteTransaction) -> Result<TxReceipt, WalletError> {
        let request = transaction_from_route(tx, self.chain_id())?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone());

        let pending_tx = provider
            .send_transaction(request)
            .await
            .map_err(|e| WalletError::Rpc(format!("Failed to send transaction: {}", e)))?;

        let tx_hash = *pending_tx.tx_hash();
        info!(tx_hash = %tx_hash, "Bridge transaction sent, waiting for confirmation");

        let receipt = tokio::time::timeout(self.receipt_timeout, pending_tx.get_receipt())
            .await
            .map_err(|_| {
                WalletError::Rpc(format!(
                    "Transaction {} not mined after {:?} (timed out)",
                    tx_hash, self.receipt_timeout
                ))
            })?
            .map_err(|e| WalletError::Rpc(format!("Failed to get receipt: {}", e)))?;

        self.finish(receipt)
    }
}

/// Parse a decimal or 0x-hex quantity
fn parse_quantity(raw: &str, field: &str) -> Result<U256, WalletError> {
    U256::from_str(raw.trim())
        .map_err(|e| WalletError::InvalidTransaction(format!("{} {:?}: {}", field, raw, e)))
}

/// Build a transaction request from a route's transaction fields.
///
/// Every present field is copied as-is; absent optional gas fields are left
/// for the provider's fillers.
pub fn transaction_from_route(
    tx: &RouteTransaction,
    chain_id: u64,
) -> Result<TransactionRequest, WalletError> {
    let to = Address::from_str(tx.target.trim()).map_err(|e| {
        WalletError::InvalidTransaction(format!("target {:?}: {}", tx.target, e))
    })?;
    let input = Bytes::from_str(tx.data.trim())
        .map_err(|e| WalletError::InvalidTransaction(format!("data: {}", e)))?;

    let value = if tx.value.trim().is_empty() {
        U256::ZERO
    } else {
        parse_quantity(&tx.value, "value")?
    };

    let mut request = TransactionRequest::default()
        .with_to(to)
        .with_input(input)
        .with_value(value)
        .with_chain_id(chain_id);

    if !tx.gas_limit.trim().is_empty() {
        let gas_limit: u64 = parse_quantity(&tx.gas_limit, "gasLimit")?
            .try_into()
            .map_err(|_| WalletError::InvalidTransaction("gasLimit overflows u64".into()))?;
        request = request.with_gas_limit(gas_limit);
    }
    if let Some(gas_price) = &tx.gas_price {
        request = request.with_gas_price(to_u128(parse_quantity(gas_price, "gasPrice")?)?);
    }
    if let Some(max_fee) = &tx.max_fee_per_gas {
        request =
            request.with_max_fee_per_gas(to_u128(parse_quantity(max_fee, "maxFeePerGas")?)?);
    }
    if let Some(priority) = &tx.max_priority_fee_per_gas {
        request = request.with_max_priority_fee_per_gas(to_u128(parse_quantity(
            priority,
            "maxPriorityFeePerGas",
        )?)?);
    }

    Ok(request)
}

fn to_u128(value: U256) -> Result<u128, WalletError> {
    value
        .try_into()
        .map_err(|_| WalletError::InvalidTransaction("gas price overflows u128".into()))
}
