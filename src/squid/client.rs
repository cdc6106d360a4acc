//! Aggregator HTTP client
//!
//! Fetches route plans and cross-chain statuses. Every request carries the
//! `x-integrator-id` header. Retries are the caller's business; this client
//! makes exactly one request per call.

use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use super::types::{RouteRequestBody, RouteResponse, StatusResponse};
use crate::bridge::{RouteSource, StatusSource};
use crate::error::SquidError;
use crate::types::{RoutePlan, RouteRequest, StatusQuery, TransferStatus};

/// Header carrying the integrator id
pub const INTEGRATOR_HEADER: &str = "x-integrator-id";

/// Response header carrying the aggregator's correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP client for the bridge aggregator
#[derive(Clone)]
pub struct SquidClient {
    base_url: String,
    integrator_id: String,
    client: Client,
}

impl std::fmt::Debug for SquidClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquidClient")
            .field("base_url", &self.base_url)
            .field("integrator_id", &"<redacted>")
            .finish()
    }
}

impl SquidClient {
    /// Create a new client for `base_url` (e.g. "https://v2.api.squidrouter.com")
    pub fn new(base_url: &str, integrator_id: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url)
            .map_err(|e| eyre!("Invalid aggregator URL {}: {}", base_url, e))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build HTTP client")?;

        info!(base_url = %base_url, "Created aggregator client");

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            integrator_id: integrator_id.to_string(),
            client,
        })
    }

    /// Request a route plan for `request`
    pub async fn get_route(&self, request: &RouteRequest) -> Result<RoutePlan, SquidError> {
        let url = format!("{}/v2/route", self.base_url);
        let body = RouteRequestBody::from(request);

        debug!(
            from_chain = %body.from_chain,
            to_chain = %body.to_chain,
            from_token = %body.from_token,
            to_token = %body.to_token,
            amount = %body.from_amount,
            "Requesting route"
        );

        let response = self
            .client
            .post(&url)
            .header(INTEGRATOR_HEADER, &self.integrator_id)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;

        check_status(status, text.as_str())?;

        let parsed: RouteResponse = serde_json::from_str(&text)?;
        let route = parsed.route.ok_or(SquidError::MissingRoute)?;
        let estimate = route
            .estimate
            .ok_or(SquidError::IncompleteRoute("estimate"))?;
        let transaction_request = route
            .transaction_request
            .ok_or(SquidError::IncompleteRoute("transactionRequest"))?;

        debug!(
            request_id = ?request_id,
            to_amount = %estimate.to_amount,
            duration_seconds = estimate.duration_seconds,
            "Route received"
        );

        Ok(RoutePlan {
            estimate,
            transaction_request,
            request: request.clone(),
            request_id,
        })
    }

    /// Fetch the cross-chain status of a submitted transfer.
    ///
    /// A 404 means the aggregator has not indexed the transaction yet and is
    /// reported as pending.
    pub async fn get_status(&self, query: &StatusQuery) -> Result<TransferStatus, SquidError> {
        let url = format!("{}/v2/status", self.base_url);

        let mut params = vec![
            ("transactionId", query.transaction_id.as_str()),
            ("fromChainId", query.from_chain_id.as_str()),
            ("toChainId", query.to_chain_id.as_str()),
        ];
        if let Some(request_id) = &query.request_id {
            params.push(("requestId", request_id.as_str()));
        }

        let response = self
            .client
            .get(&url)
            .header(INTEGRATOR_HEADER, &self.integrator_id)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(tx = %query.transaction_id, "Transfer not indexed yet");
            return Ok(TransferStatus::pending(query));
        }

        let text = response.text().await?;
        check_status(status, text.as_str())?;

        let parsed: StatusResponse = serde_json::from_str(&text)?;
        debug!(
            tx = %query.transaction_id,
            status = ?parsed.squid_transaction_status,
            detail = ?parsed.status,
            "Transfer status"
        );
        Ok(parsed.into_transfer_status(query))
    }
}

/// Map non-success HTTP statuses to errors
fn check_status(status: StatusCode, body: &str) -> Result<(), SquidError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SquidError::RateLimited {
            body: body.to_string(),
        });
    }
    if !status.is_success() {
        return Err(SquidError::Http {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl RouteSource for SquidClient {
    async fn fetch_route(&self, request: &RouteRequest) -> Result<RoutePlan, SquidError> {
        self.get_route(request).await
    }
}

#[async_trait]
impl StatusSource for SquidClient {
    async fn fetch_status(&self, query: &StatusQuery) -> Result<TransferStatus, SquidError> {
        self.get_status(query).await
    }
}
