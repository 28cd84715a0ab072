//! Trove Aggregation
//!
//! Joins independently fetched debt, collateral, and ratio accounts into
//! one [`Position`] per owner. The join is an inner join on the owner id:
//! an owner missing any of the three records, or with zero debt or zero
//! collateral, is not a live trove and is left out.
//!
//! A record that fails to decode is skipped with a warning; it never
//! aborts the batch. Output order is by owner id; callers that need the
//! risk ordering go through [`crate::sorted::sort`].

use std::collections::{BTreeMap, BTreeSet};

use aerospacer_core::AccountId;
use aerospacer_rpc::KeyedAccount;
use serde::Serialize;

use crate::decode::{self, OraclePrice};
use crate::ratio::{compute_ratio, compute_ratio_from_oracle, RatioParams};

/// A live trove: all three on-chain records present and funded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub owner: AccountId,
    pub debt_amount: u64,
    pub collateral_amount: u64,
    pub collateral_denom: String,
    /// Ratio used for ordering (recomputed from price by [`reprice`])
    pub ratio: u64,
    /// Ratio as last written on-chain
    pub stored_ratio: u64,
    /// `LiquidityThreshold` account, the neighbor-hint payload
    pub ratio_account_id: AccountId,
    pub debt_account_id: AccountId,
    pub collateral_account_id: AccountId,
}

/// Join result with counters for what was left out
#[derive(Debug, Clone, Default)]
pub struct JoinReport {
    pub positions: Vec<Position>,
    /// Accounts whose data could not be decoded
    pub skipped_malformed: usize,
    /// Owners with some but not all three records
    pub excluded_incomplete: usize,
    /// Owners with all records but zero debt or zero collateral
    pub excluded_zero: usize,
}

/// Join the three account families for `denom`
pub fn aggregate(
    debts: &[KeyedAccount],
    collaterals: &[KeyedAccount],
    ratios: &[KeyedAccount],
    denom: &str,
) -> Vec<Position> {
    aggregate_with_report(debts, collaterals, ratios, denom).positions
}

pub fn aggregate_with_report(
    debts: &[KeyedAccount],
    collaterals: &[KeyedAccount],
    ratios: &[KeyedAccount],
    denom: &str,
) -> JoinReport {
    let mut report = JoinReport::default();

    let mut debt_by_owner = BTreeMap::new();
    for account in debts {
        match decode::decode_debt(&account.data) {
            Ok(record) => {
                debt_by_owner.insert(record.owner, (account.address, record));
            }
            Err(e) => {
                tracing::warn!(account = %account.address, error = %e, "Skipping malformed debt record");
                report.skipped_malformed += 1;
            }
        }
    }

    let mut collateral_by_owner = BTreeMap::new();
    for account in collaterals {
        match decode::decode_collateral(&account.data) {
            Ok(record) if record.denom == denom => {
                collateral_by_owner.insert(record.owner, (account.address, record));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(account = %account.address, error = %e, "Skipping malformed collateral record");
                report.skipped_malformed += 1;
            }
        }
    }

    let mut ratio_by_owner = BTreeMap::new();
    for account in ratios {
        match decode::decode_ratio(&account.data) {
            Ok(record) => {
                ratio_by_owner.insert(record.owner, (account.address, record));
            }
            Err(e) => {
                tracing::warn!(account = %account.address, error = %e, "Skipping malformed ratio record");
                report.skipped_malformed += 1;
            }
        }
    }

    let owners: BTreeSet<AccountId> = debt_by_owner
        .keys()
        .chain(collateral_by_owner.keys())
        .chain(ratio_by_owner.keys())
        .copied()
        .collect();

    for owner in owners {
        let (Some((debt_id, debt)), Some((coll_id, coll)), Some((ratio_id, ratio))) = (
            debt_by_owner.get(&owner),
            collateral_by_owner.get(&owner),
            ratio_by_owner.get(&owner),
        ) else {
            tracing::debug!(owner = %owner, "Owner lacks a full record set, excluded");
            report.excluded_incomplete += 1;
            continue;
        };

        if debt.amount == 0 || coll.amount == 0 {
            report.excluded_zero += 1;
            continue;
        }

        report.positions.push(Position {
            owner,
            debt_amount: debt.amount,
            collateral_amount: coll.amount,
            collateral_denom: coll.denom.clone(),
            ratio: ratio.ratio,
            stored_ratio: ratio.ratio,
            ratio_account_id: *ratio_id,
            debt_account_id: *debt_id,
            collateral_account_id: *coll_id,
        });
    }

    tracing::debug!(
        denom,
        positions = report.positions.len(),
        malformed = report.skipped_malformed,
        incomplete = report.excluded_incomplete,
        zero = report.excluded_zero,
        "Aggregated troves"
    );
    report
}

/// Recompute every position's ordering ratio from a live float price
pub fn reprice(positions: &mut [Position], price_usd: f64, ratio_params: &RatioParams) {
    for p in positions.iter_mut() {
        p.ratio = compute_ratio(p.collateral_amount, p.debt_amount, price_usd, ratio_params);
    }
}

/// Recompute ratios from the oracle's integer answer
pub fn reprice_with_oracle(
    positions: &mut [Position],
    price: &OraclePrice,
    ratio_params: &RatioParams,
) {
    for p in positions.iter_mut() {
        p.ratio = compute_ratio_from_oracle(p.collateral_amount, p.debt_amount, price, ratio_params);
    }
}
