//! Stability Pool Reward Engine
//!
//! Product-Sum bookkeeping. `P` (scale factor) starts at 10^18 and shrinks
//! as liquidations burn pooled stake; `S` (gain factor, one per collateral
//! denom) grows as collateral is distributed. A depositor's position is
//! derived from snapshots of P and S taken at their last interaction:
//!
//! ```text
//! compounded = amount * P / p_snapshot
//! gain       = amount * (S - s_snapshot) / p_snapshot
//! ```
//!
//! When P would fall below 10^9 a new epoch starts and P resets; stakes
//! snapshotted in an earlier epoch are fully diluted. All math is BigUint
//! and total: zero divisors short-circuit to defined results.

use aerospacer_core::ProtocolError;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::constants::params::{BPS_DENOMINATOR, EPOCH_RESET_THRESHOLD, SCALE_FACTOR};
use crate::decode::{
    PoolSnapshotRecord, ProtocolStateRecord, StakeRecord, UserCollateralSnapshotRecord,
};

/// Collateral gain accrued since the user's last snapshot.
///
/// A missing user snapshot counts as a zero gain-factor snapshot.
/// Returns zero when `S <= s_snapshot` or `p_snapshot == 0`.
pub fn pending_gain(
    stake: &StakeRecord,
    pool: &PoolSnapshotRecord,
    user: Option<&UserCollateralSnapshotRecord>,
) -> BigUint {
    if let Some(user) = user {
        debug_assert_eq!(user.denom, pool.denom, "snapshot denoms must match");
    }

    let zero = BigUint::zero();
    let user_factor = user.map(|u| &u.gain_factor_snapshot).unwrap_or(&zero);

    if pool.gain_factor <= *user_factor || stake.scale_snapshot.is_zero() {
        return BigUint::zero();
    }

    BigUint::from(stake.amount) * (&pool.gain_factor - user_factor) / &stake.scale_snapshot
}

/// [`pending_gain`] with the denom precondition reported instead of asserted
pub fn pending_gain_checked(
    stake: &StakeRecord,
    pool: &PoolSnapshotRecord,
    user: Option<&UserCollateralSnapshotRecord>,
) -> Result<BigUint, ProtocolError> {
    if let Some(user) = user {
        if user.denom != pool.denom {
            return Err(ProtocolError::DenomMismatch {
                expected: pool.denom.clone(),
                found: user.denom.clone(),
            });
        }
    }
    Ok(pending_gain(stake, pool, user))
}

/// Everything a withdrawal would pay out: accrued gain plus already-credited gain
pub fn total_claimable(
    stake: &StakeRecord,
    pool: &PoolSnapshotRecord,
    user: Option<&UserCollateralSnapshotRecord>,
) -> Result<BigUint, ProtocolError> {
    let credited = user.map(|u| u.pending_gain).unwrap_or(0);
    Ok(pending_gain_checked(stake, pool, user)? + BigUint::from(credited))
}

/// Deposit value after pool losses. Unchanged if `p_snapshot == 0`.
pub fn compounded_stake(stake: &StakeRecord, current_scale: &BigUint) -> BigUint {
    if stake.scale_snapshot.is_zero() {
        return BigUint::from(stake.amount);
    }
    BigUint::from(stake.amount) * current_scale / &stake.scale_snapshot
}

/// [`compounded_stake`], zero if the stake predates the current epoch
pub fn effective_compounded_stake(
    stake: &StakeRecord,
    current_scale: &BigUint,
    current_epoch: u64,
) -> BigUint {
    if stake.epoch_snapshot != current_epoch {
        return BigUint::zero();
    }
    compounded_stake(stake, current_scale)
}

/// Share of the pool in basis points
pub fn pool_share_bps(compounded: &BigUint, total_stake: u64) -> u64 {
    if total_stake == 0 {
        return 0;
    }
    let share = compounded * BigUint::from(BPS_DENOMINATOR) / BigUint::from(total_stake);
    share.to_u64().unwrap_or(u64::MAX).min(BPS_DENOMINATOR)
}

/// Increase in S when `collateral_gain` is spread over `total_stake` at scale `p`
pub fn gain_factor_increment(collateral_gain: u64, total_stake: u64, p: &BigUint) -> BigUint {
    if total_stake == 0 {
        return BigUint::zero();
    }
    BigUint::from(collateral_gain) * p / BigUint::from(total_stake)
}

/// Pool-wide P and epoch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolScale {
    pub p: BigUint,
    pub epoch: u64,
}

impl Default for PoolScale {
    fn default() -> Self {
        Self {
            p: BigUint::from(SCALE_FACTOR),
            epoch: 0,
        }
    }
}

impl PoolScale {
    pub fn from_protocol_state(state: &ProtocolStateRecord) -> Self {
        Self {
            p: state.scale_factor.clone(),
            epoch: state.epoch,
        }
    }

    /// Shrink P after `debt_offset` of `total_stake` is burned by a liquidation.
    ///
    /// Returns true when a new epoch started.
    pub fn apply_loss(&mut self, debt_offset: u64, total_stake: u64) -> bool {
        if total_stake == 0 || debt_offset == 0 {
            return false;
        }
        if debt_offset >= total_stake {
            self.start_epoch();
            return true;
        }

        let remaining = BigUint::from(total_stake - debt_offset);
        let next = &self.p * remaining / BigUint::from(total_stake);
        if next < BigUint::from(EPOCH_RESET_THRESHOLD) {
            self.start_epoch();
            return true;
        }
        self.p = next;
        false
    }

    fn start_epoch(&mut self) {
        self.epoch += 1;
        self.p = BigUint::from(SCALE_FACTOR);
    }
}
