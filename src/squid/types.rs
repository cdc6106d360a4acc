//! Aggregator wire formats
//!
//! Request bodies and response envelopes of the route and status endpoints.
//! Domain types live in [`crate::types`]; these only shape JSON.

use serde::{Deserialize, Serialize};

use crate::types::{
    RouteEstimate, RouteRequest, RouteTransaction, SquidTransactionStatus, StatusQuery,
    TransferStatus,
};

/// Integrator fee block of a route request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectFees {
    pub integrator_address: String,
    /// Fee in basis points
    pub fee: u32,
}

/// Body of `POST /v2/route`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequestBody {
    pub from_chain: String,
    pub to_chain: String,
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    pub from_address: String,
    pub to_address: String,
    /// Slippage in percent (100 bps = 1.0)
    pub slippage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collect_fees: Option<CollectFees>,
}

impl From<&RouteRequest> for RouteRequestBody {
    fn from(request: &RouteRequest) -> Self {
        Self {
            from_chain: request.source_chain.clone(),
            to_chain: request.dest_chain.clone(),
            from_token: request.source_token.to_checksum(None),
            to_token: request.dest_token.clone(),
            from_amount: request.amount.to_string(),
            from_address: request.sender.to_checksum(None),
            to_address: request.recipient.clone(),
            slippage: request.slippage_bps as f64 / 100.0,
            collect_fees: request.fee.map(|fee| CollectFees {
                integrator_address: fee.recipient.to_checksum(None),
                fee: fee.fee_bps,
            }),
        }
    }
}

/// Response envelope of `POST /v2/route`
#[derive(Debug, Clone, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub route: Option<RouteBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBody {
    #[serde(default)]
    pub estimate: Option<RouteEstimate>,
    #[serde(default)]
    pub transaction_request: Option<RouteTransaction>,
}

/// One chain leg of a status response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLeg {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Response of `GET /v2/status`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    /// Leg-level detail such as `destination_executed`; only logged
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub squid_transaction_status: Option<SquidTransactionStatus>,
    #[serde(default)]
    pub from_chain: Option<ChainLeg>,
    #[serde(default)]
    pub to_chain: Option<ChainLeg>,
}

impl StatusResponse {
    /// Convert into a [`TransferStatus`], filling gaps from the query
    pub fn into_transfer_status(self, query: &StatusQuery) -> TransferStatus {
        TransferStatus {
            squid_transaction_status: self
                .squid_transaction_status
                .unwrap_or(SquidTransactionStatus::Pending),
            correlation_id: self.id.or_else(|| query.request_id.clone()),
            source_tx_id: self
                .from_chain
                .and_then(|leg| leg.transaction_id)
                .unwrap_or_else(|| query.transaction_id.clone()),
            dest_tx_id: self.to_chain.and_then(|leg| leg.transaction_id),
        }
    }
}
