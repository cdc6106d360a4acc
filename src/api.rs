//! HTTP endpoints
//!
//! - GET /health - Liveness check
//! - GET /metrics - Prometheus metrics
//! - GET /safe/{address}/balance - USDC and native balance of a Safe

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::WalletError;
use crate::evm::{from_token_units, BalanceSource};
use crate::metrics;
use crate::safe::SafeBalance;

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub balances: Arc<dyn BalanceSource>,
    /// Token reported as `balanceUSDC`; reported as "0" when unset
    pub usdc: Option<Address>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

enum ApiError {
    InvalidAddress(String),
    Upstream(WalletError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::InvalidAddress(raw) => (
                StatusCode::BAD_REQUEST,
                format!("invalid address: {}", raw),
            ),
            ApiError::Upstream(e) => {
                warn!(error = %e, "Balance lookup failed");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn prometheus_metrics() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::render(),
    )
        .into_response()
}

/// Read the USDC and native balance of `safe`
pub async fn lookup_balance(
    balances: &dyn BalanceSource,
    usdc: Option<Address>,
    safe: Address,
) -> Result<SafeBalance, WalletError> {
    let balance_usdc = match usdc {
        Some(usdc) => {
            let raw = balances.token_balance(usdc, safe).await?;
            let decimals = balances.token_decimals(usdc).await?;
            from_token_units(raw, decimals)
        }
        None => "0".to_string(),
    };
    let wei = balances.native_balance(safe).await?;

    Ok(SafeBalance {
        safe: safe.to_checksum(None),
        balance_usdc,
        balance_wei: wei.to_string(),
    })
}

async fn safe_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<SafeBalance>, ApiError> {
    let safe = Address::from_str(&address).map_err(|_| ApiError::InvalidAddress(address.clone()))?;
    let balance = lookup_balance(state.balances.as_ref(), state.usdc, safe)
        .await
        .map_err(ApiError::Upstream)?;
    Ok(Json(balance))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .route("/safe/{address}/balance", get(safe_balance))
        .with_state(state)
}

/// Serve the API on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> eyre::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Bind `addr` and serve the API until the process exits
pub async fn start_api_server(addr: SocketAddr, state: AppState) -> eyre::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "API server started");
    info!("  /health                - Liveness check");
    info!("  /metrics               - Prometheus metrics");
    info!("  /safe/{{address}}/balance - Safe balances");
    serve(listener, state).await
}
