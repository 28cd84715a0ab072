//! Redemption Planning
//!
//! Estimates what a redemption would extract by walking the riskiest
//! troves and taking debt proportionally to collateral. The program does
//! the authoritative extraction; this is for display and pre-validation.

use aerospacer_core::{AccountId, ProtocolError};
use serde::Serialize;

use crate::aggregate::Position;
use crate::constants::params::BPS_DENOMINATOR;

/// What a single trove contributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedemptionStep {
    pub owner: AccountId,
    pub debt_taken: u64,
    pub collateral_released: u64,
    /// The whole debt was taken
    pub closes_position: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedemptionPlan {
    pub requested: u64,
    pub collateral_estimate: u64,
    pub steps: Vec<RedemptionStep>,
    pub total_redeemed: u64,
    /// Part of `requested` the visited troves could not cover
    pub shortfall: u64,
}

impl RedemptionPlan {
    pub fn positions_consumed(&self) -> usize {
        self.steps.len()
    }

    pub fn is_fully_covered(&self) -> bool {
        self.shortfall == 0
    }

    pub fn ensure_covered(&self) -> Result<(), ProtocolError> {
        if self.is_fully_covered() {
            Ok(())
        } else {
            Err(ProtocolError::InsufficientLiquidity {
                requested: self.requested,
                available: self.total_redeemed,
            })
        }
    }
}

/// Walk `ordered` from the riskiest end, visiting at most `max_positions` troves
pub fn plan_redemption(
    ordered: &[Position],
    requested_net: u64,
    max_positions: usize,
) -> RedemptionPlan {
    let mut plan = RedemptionPlan {
        requested: requested_net,
        ..RedemptionPlan::default()
    };
    let mut remaining = requested_net;

    for position in ordered.iter().take(max_positions) {
        if remaining == 0 {
            break;
        }
        if position.debt_amount == 0 {
            continue;
        }

        let taken = remaining.min(position.debt_amount);
        let released = (position.collateral_amount as u128 * taken as u128
            / position.debt_amount as u128) as u64;

        plan.steps.push(RedemptionStep {
            owner: position.owner,
            debt_taken: taken,
            collateral_released: released,
            closes_position: taken == position.debt_amount,
        });
        plan.collateral_estimate = plan.collateral_estimate.saturating_add(released);
        plan.total_redeemed += taken;
        remaining -= taken;
    }

    plan.shortfall = remaining;
    plan
}

/// Amount left to redeem after the fee: `gross - floor(gross * fee_bps / 10000)`
pub fn net_redemption_amount(gross: u64, fee_bps: u64) -> u64 {
    let fee = gross as u128 * fee_bps.min(BPS_DENOMINATOR) as u128 / BPS_DENOMINATOR as u128;
    gross - fee as u64
}

/// Debt reachable by one redemption
pub fn available_liquidity(ordered: &[Position], max_positions: usize) -> u64 {
    ordered
        .iter()
        .take(max_positions)
        .fold(0u64, |acc, p| acc.saturating_add(p.debt_amount))
}
