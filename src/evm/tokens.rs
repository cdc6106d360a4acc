//! ERC20 Token Helpers
//!
//! Allowance, balance and metadata reads plus exact conversions between
//! human-readable amounts and raw token units.

use alloy::{
    primitives::{utils::format_units, Address, U256},
    providers::RootProvider,
    transports::http::{Client, Http},
};
use eyre::{eyre, Result};

use crate::error::WalletError;
use crate::evm::contracts::ERC20;

/// Read-only HTTP provider used for token reads
pub type HttpProvider = RootProvider<Http<Client>>;

/// Get the ERC20 token balance of an address
pub async fn get_token_balance(
    provider: &HttpProvider,
    token_address: Address,
    account: Address,
) -> Result<U256, WalletError> {
    let contract = ERC20::new(token_address, provider);
    let balance = contract
        .balanceOf(account)
        .call()
        .await
        .map_err(|e| WalletError::Rpc(format!("Failed to get balance: {}", e)))?;
    Ok(balance._0)
}

/// Get the ERC20 token allowance
pub async fn get_token_allowance(
    provider: &HttpProvider,
    token_address: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, WalletError> {
    let contract = ERC20::new(token_address, provider);
    let allowance = contract
        .allowance(owner, spender)
        .call()
        .await
        .map_err(|e| WalletError::Rpc(format!("Failed to get allowance: {}", e)))?;
    Ok(allowance._0)
}

/// Get token decimals
pub async fn get_token_decimals(
    provider: &HttpProvider,
    token_address: Address,
) -> Result<u8, WalletError> {
    let contract = ERC20::new(token_address, provider);
    let decimals = contract
        .decimals()
        .call()
        .await
        .map_err(|e| WalletError::Rpc(format!("Failed to get decimals: {}", e)))?;
    Ok(decimals._0)
}

/// Get token symbol
pub async fn get_token_symbol(
    provider: &HttpProvider,
    token_address: Address,
) -> Result<String, WalletError> {
    let contract = ERC20::new(token_address, provider);
    let symbol = contract
        .symbol()
        .call()
        .await
        .map_err(|e| WalletError::Rpc(format!("Failed to get symbol: {}", e)))?;
    Ok(symbol._0)
}

/// Convert a human-readable decimal amount ("10", "0.25") to raw token units.
///
/// Exact: rejects negative values, malformed input and more fractional
/// digits than the token has decimals.
pub fn to_token_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(eyre!("amount is empty"));
    }
    if amount.starts_with('-') {
        return Err(eyre!("amount must not be negative"));
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(eyre!("amount has no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(eyre!("amount must be a decimal number"));
    }
    if fraction.len() > decimals as usize {
        return Err(eyre!(
            "amount has more than {} decimal places",
            decimals
        ));
    }

    let digits = format!(
        "{}{:0<width$}",
        whole,
        fraction,
        width = decimals as usize
    );
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10).map_err(|e| eyre!("amount out of range: {}", e))
}

/// Convert raw token units to a human-readable decimal string
pub fn from_token_units(raw: U256, decimals: u8) -> String {
    format_units(raw, decimals).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_token_units() {
        // 10 USDC (6 decimals)
        assert_eq!(
            to_token_units("10", 6).unwrap(),
            U256::from(10_000_000u64)
        );

        // 1.5 tokens with 18 decimals
        assert_eq!(
            to_token_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );

        assert_eq!(to_token_units(".5", 6).unwrap(), U256::from(500_000u64));
        assert_eq!(to_token_units("0", 6).unwrap(), U256::ZERO);
        assert_eq!(to_token_units(" 0.000001 ", 6).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_to_token_units_rejects_bad_input() {
        assert!(to_token_units("", 6).is_err());
        assert!(to_token_units("-1", 6).is_err());
        assert!(to_token_units("1.0000001", 6).is_err());
        assert!(to_token_units("1e6", 6).is_err());
        assert!(to_token_units("1.2.3", 6).is_err());
        assert!(to_token_units(".", 6).is_err());
    }

    #[test]
    fn test_from_token_units() {
        assert_eq!(from_token_units(U256::from(100_000_000u64), 6), "100.000000");
        assert_eq!(
            from_token_units(U256::from(1_500_000_000_000_000_000u128), 18),
            "1.500000000000000000"
        );
    }
}
