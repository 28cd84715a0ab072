//! Configuration types for the Aerospacer ledger replica

use serde::{Deserialize, Serialize};

use crate::{AccountId, Error, Network};

/// RPC connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC URL (e.g., "https://api.devnet.solana.com")
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: Network::Devnet.default_rpc_url().to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// RPC connection settings
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Cluster the program is deployed on
    #[serde(default)]
    pub network: Network,

    /// Protocol program owning the trove and stake accounts (base58)
    #[serde(default = "default_protocol_program_id")]
    pub protocol_program_id: String,

    /// Oracle program answering `get_price` (base58)
    #[serde(default = "default_oracle_program_id")]
    pub oracle_program_id: String,

    /// Collateral denom the ledger is filtered to
    #[serde(default = "default_collateral_denom")]
    pub collateral_denom: String,

    #[serde(default = "default_collateral_decimals")]
    pub collateral_decimals: u32,

    #[serde(default = "default_debt_decimals")]
    pub debt_decimals: u32,

    /// Ratio below which a trove is liquidatable (1e6-scaled percent)
    #[serde(default = "default_liquidation_threshold")]
    pub liquidation_threshold: u64,

    /// Troves a single redemption may touch
    #[serde(default = "default_max_redemption_troves")]
    pub max_redemption_troves: usize,

    /// Redemption fee in basis points
    #[serde(default = "default_redemption_fee_bps")]
    pub redemption_fee_bps: u64,

    /// Troves per liquidation instruction
    #[serde(default = "default_max_liquidation_batch")]
    pub max_liquidation_batch: usize,

    /// Re-fetch cadence for the watch loop (milliseconds)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

fn default_protocol_program_id() -> String {
    "HQbV7SKnWuWPHEci5eejsnJG7qwYuQkGzJHJ6nhLZhxk".to_string()
}

fn default_oracle_program_id() -> String {
    "8Fu4YnUkfmrGQ3PTVoPfsAGjQ6NistGsiKpBEkPhzA2K".to_string()
}

fn default_collateral_denom() -> String {
    "SOL".to_string()
}

fn default_collateral_decimals() -> u32 {
    9
}

fn default_debt_decimals() -> u32 {
    18
}

fn default_liquidation_threshold() -> u64 {
    115_000_000
}

fn default_max_redemption_troves() -> usize {
    3
}

fn default_redemption_fee_bps() -> u64 {
    500
}

fn default_max_liquidation_batch() -> usize {
    50
}

fn default_refresh_interval_ms() -> u64 {
    5_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            network: Network::Devnet,
            protocol_program_id: default_protocol_program_id(),
            oracle_program_id: default_oracle_program_id(),
            collateral_denom: default_collateral_denom(),
            collateral_decimals: default_collateral_decimals(),
            debt_decimals: default_debt_decimals(),
            liquidation_threshold: default_liquidation_threshold(),
            max_redemption_troves: default_max_redemption_troves(),
            redemption_fee_bps: default_redemption_fee_bps(),
            max_liquidation_batch: default_max_liquidation_batch(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON string, filling unspecified fields with defaults
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn protocol_program(&self) -> Result<AccountId, Error> {
        parse_program_id("protocol_program_id", &self.protocol_program_id)
    }

    pub fn oracle_program(&self) -> Result<AccountId, Error> {
        parse_program_id("oracle_program_id", &self.oracle_program_id)
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.refresh_interval_ms)
    }
}

fn parse_program_id(field: &str, value: &str) -> Result<AccountId, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", field, e)))
}
