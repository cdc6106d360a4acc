//! Shared bridge types
//!
//! Route requests, route plans and transfer statuses. Field names follow the
//! aggregator's camelCase JSON so a plan fetched from the route endpoint reaches
//! the executor exactly as it was returned.

use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel address the aggregator uses for a chain's native asset
pub const NATIVE_TOKEN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

// ============================================================================
// Route Request
// ============================================================================

/// Optional integrator fee collected by the aggregator on each route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegratorFee {
    /// Address receiving the fee on the source chain
    pub recipient: Address,
    /// Fee in basis points of the transferred amount
    pub fee_bps: u32,
}

/// A cross-chain transfer request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Source chain id as the aggregator names it (e.g. "42161")
    pub source_chain: String,
    /// Destination chain id
    pub dest_chain: String,
    /// Token spent on the source chain ([`NATIVE_TOKEN`] for the native asset)
    pub source_token: Address,
    /// Token received on the destination chain (may be a non-EVM denom)
    pub dest_token: String,
    /// Amount in the source token's smallest unit
    pub amount: U256,
    /// Address signing and paying on the source chain
    pub sender: Address,
    /// Recipient on the destination chain
    pub recipient: String,
    /// Maximum slippage in basis points
    pub slippage_bps: u32,
    /// Optional integrator fee
    pub fee: Option<IntegratorFee>,
}

impl RouteRequest {
    /// Whether the source token is the chain's native asset (no allowance needed)
    pub fn is_native(&self) -> bool {
        self.source_token == NATIVE_TOKEN
    }
}

// ============================================================================
// Route Plan
// ============================================================================

/// Token metadata attached to fee and gas cost entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostToken {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub decimals: u8,
}

/// One entry of the route's fee breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCost {
    #[serde(default)]
    pub name: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<CostToken>,
}

/// One entry of the route's gas estimates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCost {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<CostToken>,
}

/// Amounts and costs the aggregator expects for a route.
///
/// Amounts are kept as the decimal strings the aggregator returns; they are
/// opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEstimate {
    pub from_amount: String,
    pub to_amount: String,
    #[serde(default)]
    pub to_amount_min: String,
    #[serde(rename = "estimatedRouteDuration", default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub fee_costs: Vec<FeeCost>,
    #[serde(default)]
    pub gas_costs: Vec<GasCost>,
}

/// The transaction the sender must submit on the source chain.
///
/// Submitted verbatim: no field is recomputed by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTransaction {
    #[serde(alias = "targetAddress")]
    pub target: String,
    pub data: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub gas_limit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
}

/// A quoted route. Value object: never mutated after the quoter returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub estimate: RouteEstimate,
    pub transaction_request: RouteTransaction,
    /// The request this plan was quoted for
    pub request: RouteRequest,
    /// Aggregator correlation id (`x-request-id` of the route response)
    pub request_id: Option<String>,
}

impl RoutePlan {
    /// Check that every field the executor needs is present.
    ///
    /// Returns the name of the first missing or unusable field.
    pub fn validate(&self) -> Result<(), &'static str> {
        let tx = &self.transaction_request;
        if tx.target.trim().is_empty() {
            return Err("transactionRequest.target");
        }
        match Address::from_str(tx.target.trim()) {
            Ok(target) if target != Address::ZERO => {}
            _ => return Err("transactionRequest.target"),
        }
        if tx.data.trim().is_empty() {
            return Err("transactionRequest.data");
        }
        if self.estimate.from_amount.trim().is_empty() {
            return Err("estimate.fromAmount");
        }
        if self.estimate.to_amount.trim().is_empty() {
            return Err("estimate.toAmount");
        }
        Ok(())
    }

    /// The contract that will pull tokens from the sender
    pub fn spender(&self) -> Option<Address> {
        Address::from_str(self.transaction_request.target.trim()).ok()
    }

    /// Amount the spender must be allowed to transfer
    pub fn required_allowance(&self) -> U256 {
        self.request.amount
    }
}

// ============================================================================
// Transfer Status
// ============================================================================

/// Cross-chain status as reported by the aggregator.
///
/// Any value the aggregator reports that is not one of the four terminal
/// values (`ongoing`, `not_found`, unknown strings) reads as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SquidTransactionStatus {
    Pending,
    Success,
    PartialSuccess,
    NeedsGas,
    Failed,
}

impl SquidTransactionStatus {
    /// Whether monitoring stops at this status
    pub fn is_terminal(self) -> bool {
        !matches!(self, SquidTransactionStatus::Pending)
    }

    pub fn is_success(self) -> bool {
        matches!(self, SquidTransactionStatus::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SquidTransactionStatus::Pending => "pending",
            SquidTransactionStatus::Success => "success",
            SquidTransactionStatus::PartialSuccess => "partial_success",
            SquidTransactionStatus::NeedsGas => "needs_gas",
            SquidTransactionStatus::Failed => "failed",
        }
    }
}

impl From<String> for SquidTransactionStatus {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "success" => SquidTransactionStatus::Success,
            "partial_success" => SquidTransactionStatus::PartialSuccess,
            "needs_gas" => SquidTransactionStatus::NeedsGas,
            "failed" | "failure" | "refunded" => SquidTransactionStatus::Failed,
            _ => SquidTransactionStatus::Pending,
        }
    }
}

impl fmt::Display for SquidTransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one status poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    /// Source-chain transaction hash
    pub transaction_id: String,
    /// Aggregator correlation id from the route response
    pub request_id: Option<String>,
    pub from_chain_id: String,
    pub to_chain_id: String,
}

impl StatusQuery {
    /// Build the query for a submitted plan
    pub fn for_plan(plan: &RoutePlan, source_tx_id: &str) -> Self {
        Self {
            transaction_id: source_tx_id.to_string(),
            request_id: plan.request_id.clone(),
            from_chain_id: plan.request.source_chain.clone(),
            to_chain_id: plan.request.dest_chain.clone(),
        }
    }
}

/// Latest known state of a cross-chain transfer. Discarded once terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    pub squid_transaction_status: SquidTransactionStatus,
    /// Aggregator correlation id
    pub correlation_id: Option<String>,
    pub source_tx_id: String,
    pub dest_tx_id: Option<String>,
}

impl TransferStatus {
    /// Status of a transfer the aggregator has not indexed yet
    pub fn pending(query: &StatusQuery) -> Self {
        Self {
            squid_transaction_status: SquidTransactionStatus::Pending,
            correlation_id: query.request_id.clone(),
            source_tx_id: query.transaction_id.clone(),
            dest_tx_id: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.squid_transaction_status.is_terminal()
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (source tx {}",
            self.squid_transaction_status, self.source_tx_id
        )?;
        if let Some(dest) = &self.dest_tx_id {
            write!(f, ", destination tx {}", dest)?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// Receipts
// ============================================================================

/// A mined source-chain transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// 0x-prefixed transaction hash
    pub tx_hash: String,
    pub block_number: Option<u64>,
}
