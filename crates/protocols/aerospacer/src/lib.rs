//! Aerospacer Protocol Implementation
//!
//! Client-side replica of the Aerospacer CDP program's sorted trove ledger.
//!
//! # Protocol Overview
//!
//! Users lock collateral in a trove and mint aUSD against it. The program
//! keeps troves ordered riskiest to safest by collateralization ratio and
//! validates each insertion against caller-supplied neighbors. A stability
//! pool of aUSD stakers absorbs liquidated debt in exchange for collateral.
//!
//! # Features
//!
//! - Binary decoding of every on-chain account family
//! - Ratio computation matching the program's fixed-point math
//! - Trove address derivation from the program's PDA seeds
//! - Ledger ordering and neighbor hints for insert/update instructions
//! - Liquidation batching and redemption estimates
//! - Stability pool compounding and gain accrual
//! - Background refresh publishing ordered snapshots
//!
//! # Example
//!
//! ```ignore
//! use aerospacer::{fetch_positions, sort, RatioParams};
//!
//! let positions = fetch_positions(&client, &program, "SOL", 150.0, &RatioParams::default()).await?;
//! let ordered = sort(positions);
//! println!("Riskiest trove: {}", ordered[0].owner);
//! ```

pub mod aggregate;
pub mod constants;
pub mod decode;
pub mod fetch;
pub mod liquidation;
pub mod pda;
pub mod ratio;
pub mod redemption;
pub mod refresh;
pub mod sorted;
pub mod stability;
pub mod state;

#[cfg(test)]
mod fixtures;

pub use aggregate::{aggregate, aggregate_with_report, reprice, JoinReport, Position};
pub use constants::*;
pub use decode::{decode, decode_checked, Record, RecordKind};
pub use fetch::{
    fetch_positions, fetch_positions_for_owners, fetch_protocol_state, fetch_stake_state,
};
pub use liquidation::{liquidation_summary, select_liquidatable, LiquidationBatch};
pub use pda::{liquidity_threshold_address, TroveAccounts};
pub use ratio::{compute_ratio, RatioParams};
pub use redemption::{net_redemption_amount, plan_redemption, RedemptionPlan};
pub use refresh::{FixedPrice, PriceFeed, RefreshConfig, RefreshHandle, RefreshTask, SharedPrice};
pub use sorted::{find_neighbors, sort, Candidate, NeighborHints};
pub use state::{LedgerSnapshot, PositionView, StakeState, StakeView};
