//! Bridge configuration
//!
//! Loaded from environment variables, reading a `.env` file first if present.

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::bridge::{BridgeParams, MonitorConfig};
use crate::retry::RetryConfig;
use crate::types::IntegratorFee;

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub squid: SquidConfig,
    pub evm: EvmConfig,
    pub bridge: BridgeConfig,
    pub status: StatusConfig,
    pub retry: RetrySettings,
    pub api: ApiConfig,
}

/// Aggregator configuration
#[derive(Clone)]
pub struct SquidConfig {
    pub api_url: String,
    pub integrator_id: String,
    pub timeout_ms: u64,
}

/// Custom Debug that redacts the integrator id
impl fmt::Debug for SquidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SquidConfig")
            .field("api_url", &self.api_url)
            .field("integrator_id", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Source chain configuration
#[derive(Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Only needed to sign approvals and bridge transactions
    pub private_key: Option<String>,
    pub receipt_timeout_ms: u64,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for EvmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("receipt_timeout_ms", &self.receipt_timeout_ms)
            .finish()
    }
}

/// Transfer parameters
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub dest_chain_id: String,
    pub source_token: String,
    pub dest_token: String,
    pub recipient: Option<String>,
    pub slippage_bps: u32,
    pub fee_recipient: Option<String>,
    pub fee_bps: Option<u32>,
    pub token_decimals: Option<u8>,
}

/// Status monitor configuration
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub grace_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

/// Network read retry configuration
#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

/// HTTP surface configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Token reported as `balanceUSDC` by the balance endpoint
    pub usdc_address: Option<String>,
    pub safe_backend_url: Option<String>,
}

/// Default functions
fn default_squid_api_url() -> String {
    "https://v2.api.squidrouter.com".to_string()
}

fn default_squid_timeout_ms() -> u64 {
    30_000
}

fn default_receipt_timeout_ms() -> u64 {
    180_000
}

fn default_slippage_bps() -> u32 {
    100
}

fn default_grace_delay_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_status_max_attempts() -> u32 {
    120
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_initial_delay_ms() -> u64 {
    1_000
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9090))
}

/// Read a required variable
fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| eyre!("{} environment variable is required", name))
}

/// Read an optional variable, treating an empty value as unset
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional variable, failing on malformed values
fn parsed<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional(name)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .wrap_err_with(|| format!("{} has an invalid value {:?}", name, v))
        })
        .transpose()
}

fn is_evm_address(value: &str) -> bool {
    value.len() == 42 && value.starts_with("0x") && Address::from_str(value).is_ok()
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
            tracing::debug!(path, "Loaded .env file");
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let squid = SquidConfig {
            api_url: optional("SQUID_API_URL").unwrap_or_else(default_squid_api_url),
            integrator_id: required("SQUID_INTEGRATOR_ID")?,
            timeout_ms: parsed("SQUID_TIMEOUT_MS")?.unwrap_or_else(default_squid_timeout_ms),
        };

        let evm = EvmConfig {
            rpc_url: required("EVM_RPC_URL")?,
            chain_id: required("EVM_CHAIN_ID")?
                .trim()
                .parse()
                .wrap_err("EVM_CHAIN_ID must be a valid u64")?,
            private_key: optional("EVM_PRIVATE_KEY"),
            receipt_timeout_ms: parsed("EVM_RECEIPT_TIMEOUT_MS")?
                .unwrap_or_else(default_receipt_timeout_ms),
        };

        let bridge = BridgeConfig {
            dest_chain_id: required("BRIDGE_DEST_CHAIN_ID")?,
            source_token: required("BRIDGE_SOURCE_TOKEN")?,
            dest_token: required("BRIDGE_DEST_TOKEN")?,
            recipient: optional("BRIDGE_RECIPIENT"),
            slippage_bps: parsed("BRIDGE_SLIPPAGE_BPS")?.unwrap_or_else(default_slippage_bps),
            fee_recipient: optional("BRIDGE_FEE_RECIPIENT"),
            fee_bps: parsed("BRIDGE_FEE_BPS")?,
            token_decimals: parsed("BRIDGE_TOKEN_DECIMALS")?,
        };

        let status = StatusConfig {
            grace_delay_ms: parsed("STATUS_GRACE_DELAY_MS")?.unwrap_or_else(default_grace_delay_ms),
            poll_interval_ms: parsed("STATUS_POLL_INTERVAL_MS")?
                .unwrap_or_else(default_poll_interval_ms),
            max_attempts: parsed("STATUS_MAX_ATTEMPTS")?
                .unwrap_or_else(default_status_max_attempts),
        };

        let retry = RetrySettings {
            max_attempts: parsed("RETRY_MAX_ATTEMPTS")?.unwrap_or_else(default_retry_max_attempts),
            initial_delay_ms: parsed("RETRY_INITIAL_DELAY_MS")?
                .unwrap_or_else(default_retry_initial_delay_ms),
        };

        let api = ApiConfig {
            bind_addr: parsed("API_BIND_ADDR")?.unwrap_or_else(default_bind_addr),
            usdc_address: optional("USDC_ADDRESS"),
            safe_backend_url: optional("SAFE_BACKEND_URL"),
        };

        let config = Config {
            squid,
            evm,
            bridge,
            status,
            retry,
            api,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.squid.api_url).is_err() {
            return Err(eyre!("squid.api_url must be a valid URL"));
        }

        if self.squid.integrator_id.trim().is_empty() {
            return Err(eyre!("squid.integrator_id cannot be empty"));
        }

        if self.evm.rpc_url.is_empty() {
            return Err(eyre!("evm.rpc_url cannot be empty"));
        }

        if let Some(key) = &self.evm.private_key {
            if key.len() != 66
                || !key.starts_with("0x")
                || !key[2..].chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(eyre!("evm.private_key must be 66 chars (0x + 64 hex chars)"));
            }
        }

        if self.bridge.dest_chain_id.trim().is_empty() {
            return Err(eyre!("bridge.dest_chain_id cannot be empty"));
        }

        if !is_evm_address(&self.bridge.source_token) {
            return Err(eyre!(
                "bridge.source_token must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        // Destination may be a non-EVM chain, so only presence is checked
        if self.bridge.dest_token.trim().is_empty() {
            return Err(eyre!("bridge.dest_token cannot be empty"));
        }

        if self.bridge.slippage_bps > 10_000 {
            return Err(eyre!("bridge.slippage_bps cannot exceed 10000"));
        }

        match (&self.bridge.fee_recipient, self.bridge.fee_bps) {
            (Some(recipient), Some(fee_bps)) => {
                if !is_evm_address(recipient) {
                    return Err(eyre!(
                        "bridge.fee_recipient must be a valid EVM address (42 chars with 0x prefix)"
                    ));
                }
                if fee_bps > 10_000 {
                    return Err(eyre!("bridge.fee_bps cannot exceed 10000"));
                }
            }
            (None, None) => {}
            _ => {
                return Err(eyre!(
                    "BRIDGE_FEE_RECIPIENT and BRIDGE_FEE_BPS must be set together"
                ))
            }
        }

        if self.evm.receipt_timeout_ms == 0 {
            return Err(eyre!("evm.receipt_timeout_ms must be greater than 0"));
        }

        if self.status.poll_interval_ms == 0 {
            return Err(eyre!("status.poll_interval_ms must be greater than 0"));
        }

        if self.status.max_attempts == 0 {
            return Err(eyre!("status.max_attempts must be greater than 0"));
        }

        if self.retry.max_attempts == 0 {
            return Err(eyre!("retry.max_attempts must be greater than 0"));
        }

        if let Some(usdc) = &self.api.usdc_address {
            if !is_evm_address(usdc) {
                return Err(eyre!("api.usdc_address must be a valid EVM address"));
            }
        }

        Ok(())
    }

    pub fn squid_timeout(&self) -> Duration {
        Duration::from_millis(self.squid.timeout_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.evm.receipt_timeout_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            ..RetryConfig::default()
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            grace_delay: Duration::from_millis(self.status.grace_delay_ms),
            poll_interval: Duration::from_millis(self.status.poll_interval_ms),
            max_attempts: self.status.max_attempts,
        }
    }

    /// Transfer parameters for the orchestrator
    pub fn bridge_params(&self) -> Result<BridgeParams> {
        let source_token = Address::from_str(&self.bridge.source_token)
            .wrap_err("bridge.source_token is not a valid address")?;

        let fee = match (&self.bridge.fee_recipient, self.bridge.fee_bps) {
            (Some(recipient), Some(fee_bps)) => Some(IntegratorFee {
                recipient: Address::from_str(recipient)
                    .wrap_err("bridge.fee_recipient is not a valid address")?,
                fee_bps,
            }),
            _ => None,
        };

        Ok(BridgeParams {
            source_chain: self.evm.chain_id.to_string(),
            dest_chain: self.bridge.dest_chain_id.clone(),
            source_token,
            dest_token: self.bridge.dest_token.clone(),
            recipient: self.bridge.recipient.clone(),
            slippage_bps: self.bridge.slippage_bps,
            fee,
            token_decimals: self.bridge.token_decimals,
        })
    }

    /// Private key, required for commands that sign
    pub fn private_key(&self) -> Result<&str> {
        self.evm
            .private_key
            .as_deref()
            .ok_or_else(|| eyre!("EVM_PRIVATE_KEY environment variable is required to sign"))
    }
}
