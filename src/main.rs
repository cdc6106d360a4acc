//! Squid Bridge CLI
//!
//! - squid-bridge quote <amount>        -> print a route plan
//! - squid-bridge bridge <amount>       -> quote, approve, execute, monitor
//! - squid-bridge status <tx>           -> one status poll
//! - squid-bridge balance <address>     -> USDC and native balance
//! - squid-bridge deploy-safe <sig>     -> deploy a Safe through the backend
//! - squid-bridge serve                 -> health, metrics and balance API

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use squid_bridge::api::{self, AppState};
use squid_bridge::bridge::{BridgeEvent, BridgeOrchestrator, SessionState};
use squid_bridge::evm::{to_token_units, ChainWallet, EvmClient, EvmWallet};
use squid_bridge::safe::SafeBackendClient;
use squid_bridge::types::{StatusQuery, NATIVE_TOKEN};
use squid_bridge::{Config, SquidClient};

#[derive(Parser)]
#[command(name = "squid-bridge")]
#[command(about = "Cross-chain transfers through the Squid aggregator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a .env file
    #[arg(long, global = true, default_value = ".env")]
    env_file: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a route plan and print it
    Quote {
        /// Amount in whole tokens (e.g. "10" or "0.25")
        amount: String,

        /// Sender address; defaults to the configured signer
        #[arg(long)]
        sender: Option<String>,
    },

    /// Run a full transfer: quote, approve, execute, monitor
    Bridge {
        /// Amount in whole tokens (e.g. "10" or "0.25")
        amount: String,
    },

    /// Poll the status of a submitted transfer once
    Status {
        /// Source-chain transaction hash
        tx_id: String,

        /// Aggregator request id from the route response
        #[arg(long)]
        request_id: Option<String>,
    },

    /// Print the USDC and native balance of an address
    Balance { address: String },

    /// Deploy (or look up) the Safe owned by the signer of a message
    DeploySafe {
        /// 0x-prefixed signature over the deployment message
        signature: String,

        /// Safe backend base URL; defaults to SAFE_BACKEND_URL
        #[arg(long)]
        backend_url: Option<String>,
    },

    /// Serve health, metrics and balance endpoints
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quote { amount, sender } => {
            let config = Config::load_from_file(&cli.env_file)?;
            quote(&config, &amount, sender).await
        }
        Commands::Bridge { amount } => {
            let config = Config::load_from_file(&cli.env_file)?;
            bridge(&config, &amount).await
        }
        Commands::Status { tx_id, request_id } => {
            let config = Config::load_from_file(&cli.env_file)?;
            status(&config, tx_id, request_id).await
        }
        Commands::Balance { address } => {
            let config = Config::load_from_file(&cli.env_file)?;
            balance(&config, &address).await
        }
        Commands::DeploySafe {
            signature,
            backend_url,
        } => {
            if std::path::Path::new(&cli.env_file).exists() {
                dotenvy::from_filename(&cli.env_file).wrap_err("Failed to load .env file")?;
            }
            let backend_url = backend_url
                .or_else(|| std::env::var("SAFE_BACKEND_URL").ok())
                .ok_or_else(|| eyre!("--backend-url or SAFE_BACKEND_URL is required"))?;
            deploy_safe(&backend_url, &signature).await
        }
        Commands::Serve => {
            let config = Config::load_from_file(&cli.env_file)?;
            serve(&config).await
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,squid_bridge=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

fn squid_client(config: &Config) -> Result<SquidClient> {
    SquidClient::new(
        &config.squid.api_url,
        &config.squid.integrator_id,
        config.squid_timeout(),
    )
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn quote(config: &Config, amount: &str, sender: Option<String>) -> Result<()> {
    let params = config.bridge_params()?;
    let sender = match sender {
        Some(raw) => Address::from_str(&raw).wrap_err("Invalid --sender address")?,
        None => {
            let wallet = EvmWallet::new(
                &config.evm.rpc_url,
                config.evm.chain_id,
                config.private_key()?,
            )?;
            wallet.address()
        }
    };

    let decimals = match params.token_decimals {
        Some(decimals) => decimals,
        None if params.source_token == NATIVE_TOKEN => 18,
        None => EvmClient::new(&config.evm.rpc_url, config.evm.chain_id)?
            .decimals(params.source_token)
            .await?,
    };
    let units = to_token_units(amount, decimals)?;

    let client = squid_client(config)?;
    let plan = squid_bridge::bridge::RouteQuoter::new(Arc::new(client), config.retry_config())
        .quote(&params.route_request(units, sender))
        .await?;

    print_json(&plan)
}

async fn bridge(config: &Config, amount: &str) -> Result<()> {
    let client = Arc::new(squid_client(config)?);
    let wallet = EvmWallet::new(&config.evm.rpc_url, config.evm.chain_id, config.private_key()?)?
        .with_receipt_timeout(config.receipt_timeout());
    let symbol = preflight(&wallet, config).await?;
    let wallet = Arc::new(wallet);

    let (events_tx, mut events_rx) = unbounded_channel();
    let orchestrator = BridgeOrchestrator::new(
        client.clone(),
        client,
        wallet,
        config.bridge_params()?,
        config.retry_config(),
        config.monitor_config(),
    )
    .with_events(events_tx);

    let params = orchestrator.params();
    info!(
        amount = %amount,
        token = %symbol,
        from_chain = %params.source_chain,
        to_chain = %params.dest_chain,
        "Bridging"
    );

    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                BridgeEvent::State(state) => info!(state = %state, "Session progress"),
                BridgeEvent::Status(status) => info!(status = %status, "Transfer status"),
            }
        }
    });

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, cancelling bridge session");
            cancel_on_signal.cancel();
        }
    });

    let session = orchestrator.start(amount, &cancel).await?;
    drop(orchestrator);
    let _ = progress.await;

    print_json(&session)?;
    match session.state {
        SessionState::Success => Ok(()),
        _ => Err(eyre!(
            "bridge session failed: {}",
            session.last_error.unwrap_or_else(|| "unknown error".to_string())
        )),
    }
}

/// Refuse to sign on a node for another chain; returns the source token symbol
async fn preflight(wallet: &EvmWallet, config: &Config) -> Result<String> {
    let rpc_chain_id = wallet.reader().get_chain_id().await?;
    if rpc_chain_id != config.evm.chain_id {
        return Err(eyre!(
            "EVM_CHAIN_ID is {} but the RPC node reports chain {}",
            config.evm.chain_id,
            rpc_chain_id
        ));
    }

    let token = config.bridge_params()?.source_token;
    if token == NATIVE_TOKEN {
        return Ok("native".to_string());
    }
    Ok(wallet.reader().symbol(token).await?)
}

async fn status(config: &Config, tx_id: String, request_id: Option<String>) -> Result<()> {
    let client = squid_client(config)?;
    let query = StatusQuery {
        transaction_id: tx_id,
        request_id,
        from_chain_id: config.evm.chain_id.to_string(),
        to_chain_id: config.bridge.dest_chain_id.clone(),
    };
    let status = client.get_status(&query).await?;
    print_json(&status)
}

async fn balance(config: &Config, address: &str) -> Result<()> {
    let account = Address::from_str(address).wrap_err("Invalid address")?;
    let client = EvmClient::new(&config.evm.rpc_url, config.evm.chain_id)?;
    let usdc = usdc_address(config)?;
    let balance = api::lookup_balance(&client, usdc, account).await?;
    print_json(&balance)
}

async fn deploy_safe(backend_url: &str, signature: &str) -> Result<()> {
    let client = SafeBackendClient::new(backend_url, Duration::from_secs(60))?;
    let deployed = client.deploy_safe(signature).await?;
    print_json(&deployed)
}

async fn serve(config: &Config) -> Result<()> {
    let client = EvmClient::new(&config.evm.rpc_url, config.evm.chain_id)?;
    let state = AppState {
        balances: Arc::new(client),
        usdc: usdc_address(config)?,
    };

    tokio::select! {
        result = api::start_api_server(config.api.bind_addr, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}

fn usdc_address(config: &Config) -> Result<Option<Address>> {
    config
        .api
        .usdc_address
        .as_deref()
        .map(|raw| Address::from_str(raw).wrap_err("Invalid USDC_ADDRESS"))
        .transpose()
}
