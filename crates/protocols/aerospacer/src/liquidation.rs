//! Liquidation Candidate Selection
//!
//! Filters the ordered ledger down to troves below the liquidation
//! threshold and packs them into instruction-sized batches.

use aerospacer_core::AccountId;
use serde::Serialize;

use crate::aggregate::Position;

/// Every position with `ratio < threshold`, riskiest first
pub fn select_liquidatable(ordered: &[Position], threshold: u64) -> Vec<&Position> {
    ordered.iter().filter(|p| p.ratio < threshold).collect()
}

/// Troves for a single `liquidate_troves` instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidationBatch {
    pub targets: Vec<AccountId>,
    /// `[debt, collateral, ratio]` account triplets, one per target, in target order
    pub remaining_accounts: Vec<AccountId>,
}

impl LiquidationBatch {
    pub fn owners(&self) -> &[AccountId] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Split the liquidatable set into batches of at most `max_batch` troves
    pub fn plan(ordered: &[Position], threshold: u64, max_batch: usize) -> Vec<Self> {
        let candidates = select_liquidatable(ordered, threshold);
        candidates
            .chunks(max_batch.max(1))
            .map(|chunk| Self {
                targets: chunk.iter().map(|p| p.owner).collect(),
                remaining_accounts: chunk
                    .iter()
                    .flat_map(|p| [p.debt_account_id, p.collateral_account_id, p.ratio_account_id])
                    .collect(),
            })
            .collect()
    }
}

/// Totals across the liquidatable set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiquidationSummary {
    pub count: usize,
    pub total_debt: u128,
    pub total_collateral: u128,
}

pub fn liquidation_summary(ordered: &[Position], threshold: u64) -> LiquidationSummary {
    select_liquidatable(ordered, threshold)
        .into_iter()
        .fold(LiquidationSummary::default(), |mut acc, p| {
            acc.count += 1;
            acc.total_debt += p.debt_amount as u128;
            acc.total_collateral += p.collateral_amount as u128;
            acc
        })
}
