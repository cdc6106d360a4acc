//! EVM Chain Support Module
//!
//! ## Submodules
//!
//! - `client` - Read-only RPC client and balance reads
//! - `contracts` - ERC20 bindings using alloy sol! macro
//! - `tokens` - ERC20 read helpers and amount conversions
//! - `wallet` - Signing wallet used for approvals and bridge submissions

pub mod client;
pub mod contracts;
pub mod tokens;
pub mod wallet;

// Re-export commonly used items
pub use client::{BalanceSource, EvmClient};
pub use contracts::ERC20;
pub use tokens::{from_token_units, to_token_units};
pub use wallet::{transaction_from_route, ChainWallet, EvmWallet};
