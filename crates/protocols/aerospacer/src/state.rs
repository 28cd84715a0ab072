//! Ledger State Views
//!
//! Serializable summaries of the derived ledger for API and CLI output.
//! Amounts are rendered as decimal strings so 18-decimal values survive
//! JSON consumers that parse numbers as doubles.

use aerospacer_core::units::{format_units, to_decimal_string};
use aerospacer_core::ProtocolError;
use num_bigint::{BigInt, BigUint};
use serde::Serialize;

use crate::aggregate::Position;
use crate::decode::{
    PoolSnapshotRecord, ProtocolStateRecord, StakeRecord, UserCollateralSnapshotRecord,
};
use crate::liquidation::liquidation_summary;
use crate::ratio::{ratio_to_percent, system_ratio, RatioParams};
use crate::stability::{
    effective_compounded_stake, pool_share_bps, total_claimable, PoolScale,
};

/// Fraction digits kept when rendering amounts
const DISPLAY_PRECISION: u32 = 6;

/// One trove in the ordered ledger
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    /// Zero-based index, riskiest first
    pub rank: usize,
    pub owner: String,
    pub debt: String,
    pub collateral: String,
    pub ratio: u64,
    pub ratio_pct: f64,
    pub stored_ratio: u64,
    pub liquidatable: bool,
    pub ratio_account: String,
}

impl PositionView {
    pub fn from_position(
        rank: usize,
        position: &Position,
        threshold: u64,
        ratio_params: &RatioParams,
    ) -> Self {
        Self {
            rank,
            owner: position.owner.to_string(),
            debt: format_units(
                position.debt_amount,
                ratio_params.debt_decimals,
                DISPLAY_PRECISION,
            ),
            collateral: format_units(
                position.collateral_amount,
                ratio_params.collateral_decimals,
                DISPLAY_PRECISION,
            ),
            ratio: position.ratio,
            ratio_pct: ratio_to_percent(position.ratio),
            stored_ratio: position.stored_ratio,
            liquidatable: position.ratio < threshold,
            ratio_account: position.ratio_account_id.to_string(),
        }
    }
}

/// The whole ordered ledger at one price
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub denom: String,
    pub price_usd: f64,
    pub positions: Vec<PositionView>,
    /// Number of troves below the liquidation threshold
    pub liquidatable: usize,
    pub total_debt: String,
    pub total_collateral: String,
    pub system_ratio: u64,
    pub system_ratio_pct: f64,

    /// Ordered positions the views were built from
    #[serde(skip)]
    pub ordered: Vec<Position>,
}

impl LedgerSnapshot {
    /// Build from positions already in risk order
    pub fn from_positions(
        denom: &str,
        ordered: Vec<Position>,
        price_usd: f64,
        threshold: u64,
        ratio_params: &RatioParams,
    ) -> Self {
        let summary = liquidation_summary(&ordered, threshold);
        let total_debt: u128 = ordered.iter().map(|p| p.debt_amount as u128).sum();
        let total_collateral: u128 = ordered.iter().map(|p| p.collateral_amount as u128).sum();
        let ratio = system_ratio(total_collateral, total_debt, price_usd, ratio_params);

        Self {
            denom: denom.to_string(),
            price_usd,
            positions: ordered
                .iter()
                .enumerate()
                .map(|(rank, p)| PositionView::from_position(rank, p, threshold, ratio_params))
                .collect(),
            liquidatable: summary.count,
            total_debt: to_decimal_string(
                &BigInt::from(total_debt),
                ratio_params.debt_decimals,
                DISPLAY_PRECISION,
            ),
            total_collateral: to_decimal_string(
                &BigInt::from(total_collateral),
                ratio_params.collateral_decimals,
                DISPLAY_PRECISION,
            ),
            system_ratio: ratio,
            system_ratio_pct: ratio_to_percent(ratio),
            ordered,
        }
    }

    /// Snapshot of an empty ledger
    pub fn empty(denom: &str, price_usd: f64, ratio_params: &RatioParams) -> Self {
        Self::from_positions(denom, Vec::new(), price_usd, 0, ratio_params)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Raw stability pool records for one depositor
#[derive(Debug, Clone, Default)]
pub struct StakeState {
    pub stake: Option<StakeRecord>,
    pub pool: Option<PoolSnapshotRecord>,
    pub user_snapshot: Option<UserCollateralSnapshotRecord>,
}

/// A depositor's derived stability pool position
#[derive(Debug, Clone, Serialize)]
pub struct StakeView {
    pub owner: String,
    pub denom: String,
    pub deposited: String,
    pub compounded: String,
    pub claimable_gain: String,
    pub epoch_snapshot: u64,
    pub current_epoch: u64,
    pub pool_share_bps: u64,
}

impl StakeView {
    /// Derive the view, or `None` when the owner has no stake record.
    ///
    /// A missing pool snapshot means no collateral was ever distributed
    /// for the denom, so the gain is zero.
    pub fn from_state(
        state: &StakeState,
        denom: &str,
        protocol: Option<&ProtocolStateRecord>,
        ratio_params: &RatioParams,
    ) -> Result<Option<Self>, ProtocolError> {
        let Some(stake) = &state.stake else {
            return Ok(None);
        };

        let scale = protocol
            .map(PoolScale::from_protocol_state)
            .unwrap_or_default();
        let total_stake = protocol.map(|s| s.total_stake).unwrap_or(0);

        let compounded = effective_compounded_stake(stake, &scale.p, scale.epoch);
        let claimable = match &state.pool {
            Some(pool) => total_claimable(stake, pool, state.user_snapshot.as_ref())?,
            None => BigUint::from(
                state
                    .user_snapshot
                    .as_ref()
                    .map(|u| u.pending_gain)
                    .unwrap_or(0),
            ),
        };

        Ok(Some(Self {
            owner: stake.owner.to_string(),
            denom: denom.to_string(),
            deposited: format_units(stake.amount, ratio_params.debt_decimals, DISPLAY_PRECISION),
            compounded: to_decimal_string(
                &BigInt::from(compounded.clone()),
                ratio_params.debt_decimals,
                DISPLAY_PRECISION,
            ),
            claimable_gain: to_decimal_string(
                &BigInt::from(claimable),
                ratio_params.collateral_decimals,
                DISPLAY_PRECISION,
            ),
            epoch_snapshot: stake.epoch_snapshot,
            current_epoch: scale.epoch,
            pool_share_bps: pool_share_bps(&compounded, total_stake),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::params::{MINIMUM_COLLATERAL_RATIO, SCALE_FACTOR};
    use crate::fixtures::*;
    use crate::sorted::sort;
    use aerospacer_core::AccountId;

    fn protocol_state(total_stake: u64, scale: u128, epoch: u64) -> ProtocolStateRecord {
        ProtocolStateRecord {
            admin: AccountId::default(),
            oracle_program: AccountId::default(),
            oracle_state: AccountId::default(),
            fee_distributor: AccountId::default(),
            fee_state: AccountId::default(),
            minimum_collateral_ratio: MINIMUM_COLLATERAL_RATIO,
            protocol_fee: 5,
            stable_coin_mint: AccountId::default(),
            stable_coin_code_id: 0,
            total_debt: 0,
            total_stake,
            scale_factor: BigUint::from(scale),
            epoch,
        }
    }

    // ===== Ledger snapshot =====

    #[test]
    fn test_snapshot_totals_and_ranks() {
        let ordered = sort(vec![
            position(2, 150, 2 * AUSD),
            position(1, 110, AUSD),
        ]);
        let snapshot = LedgerSnapshot::from_positions(
            "SOL",
            ordered,
            100.0,
            MINIMUM_COLLATERAL_RATIO,
            &RatioParams::default(),
        );

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.liquidatable, 1);
        assert_eq!(snapshot.total_debt, "3");
        assert_eq!(snapshot.positions[0].rank, 0);
        assert_eq!(snapshot.positions[0].owner, owner(1).to_string());
        assert!(snapshot.positions[0].liquidatable);
        assert!(!snapshot.positions[1].liquidatable);
        assert_eq!(snapshot.positions[1].ratio_pct, 150.0);
    }

    #[test]
    fn test_snapshot_serializes_without_raw_positions() {
        let snapshot = LedgerSnapshot::from_positions(
            "SOL",
            vec![position(1, 120, AUSD)],
            100.0,
            MINIMUM_COLLATERAL_RATIO,
            &RatioParams::default(),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("ordered").is_none());
        assert_eq!(json["positions"].as_array().unwrap().len(), 1);
        assert_eq!(json["positions"][0]["debt"], "1");
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = LedgerSnapshot::empty("SOL", 100.0, &RatioParams::default());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.liquidatable, 0);
        assert_eq!(snapshot.system_ratio, crate::constants::params::RATIO_SENTINEL);
    }

    // ===== Stake view =====

    fn stake_state(amount: u64) -> StakeState {
        StakeState {
            stake: Some(StakeRecord {
                owner: owner(7),
                amount,
                scale_snapshot: BigUint::from(SCALE_FACTOR),
                epoch_snapshot: 0,
                last_update_block: 10,
            }),
            pool: Some(PoolSnapshotRecord {
                denom: "SOL".to_string(),
                gain_factor: BigUint::from(SCALE_FACTOR / 1_000_000_000),
                total_collateral_gained: 0,
                epoch: 0,
            }),
            user_snapshot: None,
        }
    }

    #[test]
    fn test_stake_view_without_stake() {
        let view =
            StakeView::from_state(&StakeState::default(), "SOL", None, &RatioParams::default())
                .unwrap();
        assert!(view.is_none());
    }

    #[test]
    fn test_stake_view_compounds_and_accrues() {
        let protocol = protocol_state(4 * AUSD, SCALE_FACTOR / 2, 0);
        let view = StakeView::from_state(
            &stake_state(2 * AUSD),
            "SOL",
            Some(&protocol),
            &RatioParams::default(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(view.deposited, "2");
        assert_eq!(view.compounded, "1");
        // 2e18 * 1e9 / 1e18 = 2e9 lamports
        assert_eq!(view.claimable_gain, "2");
        assert_eq!(view.pool_share_bps, 2_500);
    }

    #[test]
    fn test_stake_view_prior_epoch() {
        let protocol = protocol_state(AUSD, SCALE_FACTOR, 3);
        let view = StakeView::from_state(
            &stake_state(AUSD),
            "SOL",
            Some(&protocol),
            &RatioParams::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(view.compounded, "0");
        assert_eq!(view.current_epoch, 3);
        assert_eq!(view.pool_share_bps, 0);
    }
}
