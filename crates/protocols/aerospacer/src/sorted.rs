//! Sorted Trove Index & Neighbor Hints
//!
//! The program keeps troves in a list sorted riskiest to safest and checks
//! each insertion against two caller-supplied neighbors instead of walking
//! the list. The list pointers are not readable client-side, so the order
//! is rebuilt from scratch every cycle from the aggregated positions.
//!
//! Ordering: ratio ascending, ties broken by debt descending.

use std::cmp::Ordering;

use aerospacer_core::{AccountId, ProtocolError};
use serde::Serialize;

use crate::aggregate::Position;
use crate::ratio::{compute_ratio, RatioParams};

/// Riskiest first; on equal ratio the larger debt goes first
pub fn compare(a: &Position, b: &Position) -> Ordering {
    a.ratio
        .cmp(&b.ratio)
        .then_with(|| b.debt_amount.cmp(&a.debt_amount))
}

/// Stable sort by [`compare`]
pub fn sort(mut positions: Vec<Position>) -> Vec<Position> {
    positions.sort_by(compare);
    positions
}

pub fn is_sorted(positions: &[Position]) -> bool {
    positions
        .windows(2)
        .all(|w| compare(&w[0], &w[1]) != Ordering::Greater)
}

/// Index of `owner` in an ordered list
pub fn position_of(owner: &AccountId, ordered: &[Position]) -> Option<usize> {
    ordered.iter().position(|p| p.owner == *owner)
}

/// A trove about to be opened or updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub owner: AccountId,
    pub debt_amount: u64,
    pub collateral_amount: u64,
    pub ratio: u64,
    /// The candidate's own `LiquidityThreshold` account
    pub ratio_account_id: AccountId,
}

impl Candidate {
    /// Build from proposed amounts, pricing the ratio the same way positions are repriced
    pub fn from_amounts(
        owner: AccountId,
        ratio_account_id: AccountId,
        collateral_amount: u64,
        debt_amount: u64,
        price_usd: f64,
        ratio_params: &RatioParams,
    ) -> Self {
        Self {
            owner,
            debt_amount,
            collateral_amount,
            ratio: compute_ratio(collateral_amount, debt_amount, price_usd, ratio_params),
            ratio_account_id,
        }
    }
}

/// Neighbors of a simulated insertion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NeighborHints {
    /// Nearest position with ratio <= the candidate's
    pub prev: Option<AccountId>,
    /// Nearest position with ratio > the candidate's
    pub next: Option<AccountId>,
    #[serde(skip)]
    pub prev_ratio: Option<u64>,
    #[serde(skip)]
    pub next_ratio: Option<u64>,
}

impl NeighborHints {
    /// Accounts to pass as remaining accounts, ordered `[prev, next]`.
    ///
    /// At the head of the list (no `prev`) this is empty rather than
    /// `[next]`: the validator reads a single hint as `prev`, so a lone
    /// `next` would be checked against the wrong side.
    // TODO: revisit once the program accepts an explicit head marker
    pub fn to_hint_accounts(&self) -> Vec<AccountId> {
        match (self.prev, self.next) {
            (None, _) => Vec::new(),
            (Some(prev), None) => vec![prev],
            (Some(prev), Some(next)) => vec![prev, next],
        }
    }

    pub fn is_head(&self) -> bool {
        self.prev.is_none()
    }

    /// Check `ratio` against the neighbor ratios as the program will
    pub fn validate(&self, ratio: u64) -> Result<(), ProtocolError> {
        validate_ordering(self.prev_ratio, ratio, self.next_ratio)
    }
}

/// Simulate inserting `candidate` into `ordered` and return its neighbors.
///
/// Entries belonging to the candidate's owner are dropped first so an
/// update is never compared with its own previous state. The insertion
/// point is the first entry whose ratio is strictly greater.
pub fn find_neighbors(candidate: &Candidate, ordered: &[Position]) -> NeighborHints {
    let survivors: Vec<&Position> = ordered
        .iter()
        .filter(|p| p.owner != candidate.owner)
        .collect();

    let index = survivors
        .iter()
        .position(|p| p.ratio > candidate.ratio)
        .unwrap_or(survivors.len());

    let prev = index.checked_sub(1).map(|i| survivors[i]);
    let next = survivors.get(index).copied();

    NeighborHints {
        prev: prev.map(|p| p.ratio_account_id),
        next: next.map(|p| p.ratio_account_id),
        prev_ratio: prev.map(|p| p.ratio),
        next_ratio: next.map(|p| p.ratio),
    }
}

/// Off-chain mirror of the program's `prev <= ratio <= next` check
pub fn validate_ordering(
    prev_ratio: Option<u64>,
    ratio: u64,
    next_ratio: Option<u64>,
) -> Result<(), ProtocolError> {
    if let Some(prev) = prev_ratio {
        if prev > ratio {
            return Err(ProtocolError::InvalidOrdering {
                reason: format!("previous ratio {} exceeds {}", prev, ratio),
            });
        }
    }
    if let Some(next) = next_ratio {
        if ratio > next {
            return Err(ProtocolError::InvalidOrdering {
                reason: format!("ratio {} exceeds next ratio {}", ratio, next),
            });
        }
    }
    Ok(())
}
