//! Read-only EVM RPC client
//!
//! Backs the balance endpoint and the read half of the signing wallet.

use alloy::{
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::info;

use super::tokens::{self, HttpProvider};
use crate::error::WalletError;

/// Balance reads for a Safe or EOA
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256, WalletError>;
    async fn native_balance(&self, account: Address) -> Result<U256, WalletError>;
    async fn token_decimals(&self, token: Address) -> Result<u8, WalletError>;
}

/// Read-only EVM RPC client
pub struct EvmClient {
    /// The alloy provider
    provider: HttpProvider,
    /// Chain ID
    pub chain_id: u64,
}

impl EvmClient {
    /// Create a new read-only EVM client
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(rpc_url = %rpc_url, chain_id = chain_id, "Created read-only EVM client");

        Ok(Self { provider, chain_id })
    }

    /// Get the ETH balance of an address
    pub async fn get_balance(&self, address: Address) -> Result<U256, WalletError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| WalletError::Rpc(format!("Failed to get native balance: {}", e)))
    }

    /// Get the chain ID from the RPC
    pub async fn get_chain_id(&self) -> Result<u64, WalletError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| WalletError::Rpc(format!("Failed to get chain id: {}", e)))
    }

    pub async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError> {
        tokens::get_token_allowance(&self.provider, token, owner, spender).await
    }

    pub async fn decimals(&self, token: Address) -> Result<u8, WalletError> {
        tokens::get_token_decimals(&self.provider, token).await
    }

    pub async fn symbol(&self, token: Address) -> Result<String, WalletError> {
        tokens::get_token_symbol(&self.provider, token).await
    }
}

#[async_trait]
impl BalanceSource for EvmClient {
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256, WalletError> {
        tokens::get_token_balance(&self.provider, token, account).await
    }

    async fn native_balance(&self, account: Address) -> Result<U256, WalletError> {
        self.get_balance(account).await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, WalletError> {
        self.decimals(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EvmClient::new("http://localhost:8545", 31337).unwrap();
        assert_eq!(client.chain_id, 31337);
    }

    #[test]
    fn test_invalid_rpc_url() {
        assert!(EvmClient::new("not a url", 1).is_err());
    }
}
