//! Aerospacer ledger command-line library

pub mod args;
pub mod commands;

use std::sync::Arc;

use aerospacer::{FixedPrice, RefreshConfig, RefreshTask};
use aerospacer_core::AppConfig;
use aerospacer_rpc::{AccountSource, RpcClient};
use anyhow::{Context, Result};
use serde_json::{json, Value};

use args::{Cli, Command, ConfigSource};

/// Environment variable consulted when `--price` is absent
pub const PRICE_ENV: &str = "AEROSPACER_PRICE_USD";

/// Log to stderr so stdout stays machine-readable
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aerospacer=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("initializing tracing: {}", e))
}

pub fn load_config(source: &ConfigSource) -> Result<AppConfig> {
    match source {
        ConfigSource::Defaults => Ok(AppConfig::default()),
        ConfigSource::File(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            AppConfig::from_json(&raw).with_context(|| format!("parsing config {}", path.display()))
        }
    }
}

fn resolve_price(flag: Option<f64>) -> Result<f64> {
    if let Some(price) = flag {
        return Ok(price);
    }
    let raw = std::env::var(PRICE_ENV)
        .with_context(|| format!("no price given: pass --price or set {}", PRICE_ENV))?;
    let price: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{} is not a number: {:?}", PRICE_ENV, raw))?;
    if !price.is_finite() || price <= 0.0 {
        anyhow::bail!("{} must be a positive price, got {}", PRICE_ENV, price);
    }
    Ok(price)
}

fn print(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let client = Arc::new(RpcClient::new(config.rpc.clone())?);
    tracing::info!(rpc = %config.rpc.url, program = %config.protocol_program_id, "Aerospacer ledger");

    let price = if cli.command.needs_price() {
        resolve_price(cli.price)?
    } else {
        0.0
    };
    let source: &dyn AccountSource = client.as_ref();

    let output = match cli.command {
        Command::Troves => commands::troves(source, &config, price).await?,
        Command::Liquidatable => commands::liquidatable(source, &config, price).await?,
        Command::Hints {
            owner,
            collateral,
            debt,
        } => commands::hints(source, &config, price, owner, &collateral, &debt).await?,
        Command::Redeem { amount } => commands::redeem(source, &config, price, &amount).await?,
        Command::Stake { owner } => commands::stake(source, &config, owner).await?,
        Command::Watch => return watch(client, &config, price).await,
    };
    print(&output)
}

async fn watch(client: Arc<RpcClient>, config: &AppConfig, price: f64) -> Result<()> {
    let handle = RefreshTask::spawn(
        client,
        Arc::new(FixedPrice(price)),
        RefreshConfig::from_app_config(config)?,
    );
    let mut snapshots = handle.subscribe();

    while snapshots.changed().await.is_ok() {
        let latest = snapshots.borrow_and_update().clone();
        if let Some(snapshot) = latest {
            print(&json!({
                "positions": snapshot.len(),
                "liquidatable": snapshot.liquidatable,
                "total_debt": snapshot.total_debt,
                "system_ratio": snapshot.system_ratio,
                "riskiest": snapshot.positions.first(),
            }))?;
        }
    }

    handle.cancel().await;
    Ok(())
}
