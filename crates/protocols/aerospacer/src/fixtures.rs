//! Shared test fixtures

use aerospacer_core::AccountId;
use aerospacer_rpc::KeyedAccount;

use crate::aggregate::Position;
use crate::decode::{CollateralRecord, DebtRecord, RatioRecord, Record};

pub const SOL: u64 = 1_000_000_000;
pub const AUSD: u64 = 1_000_000_000_000_000_000;

pub fn owner(b: u8) -> AccountId {
    AccountId::new([b; 32])
}

/// Distinct address per (owner, account family)
pub fn address(b: u8, tag: u8) -> AccountId {
    let mut bytes = [b; 32];
    bytes[0] = tag;
    AccountId::new(bytes)
}

pub fn debt_account(b: u8, amount: u64) -> KeyedAccount {
    let record = Record::Debt(DebtRecord {
        owner: owner(b),
        amount,
    });
    KeyedAccount::new(address(b, 0xd0), record.encode())
}

pub fn collateral_account(b: u8, denom: &str, amount: u64) -> KeyedAccount {
    let record = Record::Collateral(CollateralRecord {
        owner: owner(b),
        denom: denom.to_string(),
        amount,
    });
    KeyedAccount::new(address(b, 0xc0), record.encode())
}

pub fn ratio_account(b: u8, ratio: u64) -> KeyedAccount {
    let record = Record::Ratio(RatioRecord {
        owner: owner(b),
        ratio,
    });
    KeyedAccount::new(address(b, 0xa0), record.encode())
}

/// Position with the given ratio (in whole percent) and debt
pub fn position(b: u8, ratio_pct: u64, debt: u64) -> Position {
    Position {
        owner: owner(b),
        debt_amount: debt,
        collateral_amount: debt,
        collateral_denom: "SOL".to_string(),
        ratio: ratio_pct * 1_000_000,
        stored_ratio: ratio_pct * 1_000_000,
        ratio_account_id: address(b, 0xa0),
        debt_account_id: address(b, 0xd0),
        collateral_account_id: address(b, 0xc0),
    }
}
