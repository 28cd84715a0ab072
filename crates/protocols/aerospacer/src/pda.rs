//! Aerospacer Account Addresses
//!
//! Program-derived addresses of a trove's three accounts, using the same
//! seeds as the on-chain program.

use aerospacer_core::AccountId;

use crate::constants::seeds;

pub fn user_debt_address(program: &AccountId, owner: &AccountId) -> AccountId {
    program
        .find_program_address(&[seeds::USER_DEBT_AMOUNT, owner.as_ref()])
        .0
}

/// The owner's `LiquidityThreshold` account, which holds the trove's ratio
pub fn liquidity_threshold_address(program: &AccountId, owner: &AccountId) -> AccountId {
    program
        .find_program_address(&[seeds::LIQUIDITY_THRESHOLD, owner.as_ref()])
        .0
}

pub fn user_collateral_address(program: &AccountId, owner: &AccountId, denom: &str) -> AccountId {
    program
        .find_program_address(&[
            seeds::USER_COLLATERAL_AMOUNT,
            owner.as_ref(),
            denom.as_bytes(),
        ])
        .0
}

/// Account addresses of one trove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TroveAccounts {
    pub debt: AccountId,
    pub collateral: AccountId,
    pub ratio: AccountId,
}

impl TroveAccounts {
    pub fn derive(program: &AccountId, owner: &AccountId, denom: &str) -> Self {
        Self {
            debt: user_debt_address(program, owner),
            collateral: user_collateral_address(program, owner, denom),
            ratio: liquidity_threshold_address(program, owner),
        }
    }
}
