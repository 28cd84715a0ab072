//! Aerospacer State Fetching
//!
//! Scans the protocol program's accounts by discriminator and hands the raw
//! bytes to the decoder and aggregator. Network failures propagate; a single
//! undecodable account is logged and skipped.

use aerospacer_core::{AccountId, Result};
use aerospacer_rpc::{AccountFilter, AccountSource, KeyedAccount};

use crate::aggregate::{aggregate_with_report, reprice, Position};
use crate::constants::discriminators;
use crate::decode::{self, ProtocolStateRecord};
use crate::pda::TroveAccounts;
use crate::ratio::RatioParams;
use crate::state::StakeState;

/// Byte offset of the owner field in owner-keyed records
const OWNER_OFFSET: usize = 8;

async fn scan(
    source: &dyn AccountSource,
    program: &AccountId,
    discriminator: [u8; 8],
) -> Result<Vec<KeyedAccount>> {
    Ok(source
        .get_program_accounts(program, &[AccountFilter::memcmp(0, discriminator)])
        .await?)
}

async fn scan_owned(
    source: &dyn AccountSource,
    program: &AccountId,
    discriminator: [u8; 8],
    owner: &AccountId,
) -> Result<Vec<KeyedAccount>> {
    let filters = [
        AccountFilter::memcmp(0, discriminator),
        AccountFilter::memcmp(OWNER_OFFSET, owner.as_bytes().to_vec()),
    ];
    Ok(source.get_program_accounts(program, &filters).await?)
}

/// Fetch every live trove for `denom`, priced at `price_usd`, in owner order
pub async fn fetch_positions(
    source: &dyn AccountSource,
    program: &AccountId,
    denom: &str,
    price_usd: f64,
    ratio_params: &RatioParams,
) -> Result<Vec<Position>> {
    let debts = scan(source, program, discriminators::USER_DEBT_AMOUNT).await?;
    let collaterals = scan(source, program, discriminators::USER_COLLATERAL_AMOUNT).await?;
    let ratios = scan(source, program, discriminators::LIQUIDITY_THRESHOLD).await?;

    tracing::debug!(
        program = %program,
        debts = debts.len(),
        collaterals = collaterals.len(),
        ratios = ratios.len(),
        "Scanned trove accounts"
    );

    let mut positions = aggregate_with_report(&debts, &collaterals, &ratios, denom).positions;
    reprice(&mut positions, price_usd, ratio_params);
    Ok(positions)
}

/// Point lookup of known owners' troves in a single batch request.
///
/// Trove addresses are derived from each owner. One result per owner, in
/// order. `None` marks a trove with a missing, malformed, or non-matching
/// account, or one that is no longer funded.
pub async fn fetch_positions_for_owners(
    source: &dyn AccountSource,
    program: &AccountId,
    owners: &[AccountId],
    denom: &str,
    price_usd: f64,
    ratio_params: &RatioParams,
) -> Result<Vec<Option<Position>>> {
    let troves: Vec<TroveAccounts> = owners
        .iter()
        .map(|owner| TroveAccounts::derive(program, owner, denom))
        .collect();
    let ids: Vec<AccountId> = troves
        .iter()
        .flat_map(|t| [t.debt, t.collateral, t.ratio])
        .collect();
    let found = source.get_multiple_accounts(&ids).await?;

    let mut results = Vec::with_capacity(troves.len());
    for ((owner, trove), chunk) in owners.iter().zip(&troves).zip(found.chunks(3)) {
        let [Some(debt), Some(coll), Some(ratio)] = chunk else {
            tracing::debug!(owner = %owner, ratio_account = %trove.ratio, "Trove accounts missing");
            results.push(None);
            continue;
        };

        let mut joined = aggregate_with_report(
            &[KeyedAccount::new(trove.debt, debt.clone())],
            &[KeyedAccount::new(trove.collateral, coll.clone())],
            &[KeyedAccount::new(trove.ratio, ratio.clone())],
            denom,
        )
        .positions;
        reprice(&mut joined, price_usd, ratio_params);
        results.push(joined.pop().filter(|p| p.owner == *owner));
    }
    Ok(results)
}

/// A depositor's stake plus the pool and user gain snapshots for `denom`
pub async fn fetch_stake_state(
    source: &dyn AccountSource,
    program: &AccountId,
    owner: &AccountId,
    denom: &str,
) -> Result<StakeState> {
    let mut state = StakeState::default();

    for account in scan_owned(source, program, discriminators::USER_STAKE_AMOUNT, owner).await? {
        match decode::decode_stake(&account.data) {
            Ok(record) => {
                state.stake = Some(record);
                break;
            }
            Err(e) => {
                tracing::warn!(account = %account.address, error = %e, "Skipping malformed stake record");
            }
        }
    }

    for account in scan(source, program, discriminators::STABILITY_POOL_SNAPSHOT).await? {
        match decode::decode_pool_snapshot(&account.data) {
            Ok(record) if record.denom == denom => {
                state.pool = Some(record);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(account = %account.address, error = %e, "Skipping malformed pool snapshot");
            }
        }
    }

    let snapshots =
        scan_owned(source, program, discriminators::USER_COLLATERAL_SNAPSHOT, owner).await?;
    for account in snapshots {
        match decode::decode_user_collateral_snapshot(&account.data) {
            Ok(record) if record.denom == denom => {
                state.user_snapshot = Some(record);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(account = %account.address, error = %e, "Skipping malformed user snapshot");
            }
        }
    }

    Ok(state)
}

/// The program's global state account, if one decodes
pub async fn fetch_protocol_state(
    source: &dyn AccountSource,
    program: &AccountId,
) -> Result<Option<ProtocolStateRecord>> {
    for account in scan(source, program, discriminators::STATE_ACCOUNT).await? {
        match decode::decode_protocol_state(&account.data) {
            Ok(record) => return Ok(Some(record)),
            Err(e) => {
                tracing::warn!(account = %account.address, error = %e, "Skipping malformed state account");
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::params::SCALE_FACTOR;
    use crate::decode::{PoolSnapshotRecord, Record, StakeRecord, UserCollateralSnapshotRecord};
    use crate::fixtures::*;
    use aerospacer_rpc::MemoryAccountSource;
    use num_bigint::BigUint;

    fn program() -> AccountId {
        AccountId::new([0xee; 32])
    }

    fn insert(source: &MemoryAccountSource, account: KeyedAccount) {
        source.insert(program(), account.address, account.data);
    }

    fn seeded() -> MemoryAccountSource {
        let source = MemoryAccountSource::new();
        for (b, debt, coll) in [(1u8, 10 * AUSD, SOL / 10), (2, 5 * AUSD, SOL / 10)] {
            insert(&source, debt_account(b, debt));
            insert(&source, collateral_account(b, "SOL", coll));
            insert(&source, ratio_account(b, 1));
        }
        source
    }

    // ===== Positions =====

    #[tokio::test]
    async fn test_fetch_positions_reprices() {
        let source = seeded();
        let positions = fetch_positions(&source, &program(), "SOL", 100.0, &RatioParams::default())
            .await
            .unwrap();

        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].owner, owner(1));
        assert_eq!(positions[0].ratio, 100_000_000);
        assert_eq!(positions[1].ratio, 200_000_000);
        assert_eq!(positions[0].stored_ratio, 1);
    }

    #[tokio::test]
    async fn test_fetch_ignores_other_programs() {
        let source = seeded();
        let stray = debt_account(3, AUSD);
        source.insert(AccountId::new([0x11; 32]), stray.address, stray.data);
        insert(&source, collateral_account(3, "SOL", SOL));
        insert(&source, ratio_account(3, 1));

        let positions = fetch_positions(&source, &program(), "SOL", 100.0, &RatioParams::default())
            .await
            .unwrap();
        assert_eq!(positions.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_skips_malformed() {
        let source = seeded();
        let mut bad = ratio_account(2, 1);
        bad.data.truncate(12);
        insert(&source, bad);

        let positions = fetch_positions(&source, &program(), "SOL", 100.0, &RatioParams::default())
            .await
            .unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].owner, owner(1));
    }

    fn insert_derived_trove(source: &MemoryAccountSource, b: u8, debt: u64, coll: u64) {
        let trove = TroveAccounts::derive(&program(), &owner(b), "SOL");
        insert(source, KeyedAccount::new(trove.debt, debt_account(b, debt).data));
        insert(
            source,
            KeyedAccount::new(trove.collateral, collateral_account(b, "SOL", coll).data),
        );
        insert(source, KeyedAccount::new(trove.ratio, ratio_account(b, 1).data));
    }

    #[tokio::test]
    async fn test_fetch_positions_for_owners() {
        let source = MemoryAccountSource::new();
        insert_derived_trove(&source, 2, 5 * AUSD, SOL / 10);

        let found = fetch_positions_for_owners(
            &source,
            &program(),
            &[owner(2), owner(9)],
            "SOL",
            100.0,
            &RatioParams::default(),
        )
        .await
        .unwrap();

        assert_eq!(found.len(), 2);
        let trove = TroveAccounts::derive(&program(), &owner(2), "SOL");
        let position = found[0].as_ref().unwrap();
        assert_eq!(position.owner, owner(2));
        assert_eq!(position.ratio, 200_000_000);
        assert_eq!(position.ratio_account_id, trove.ratio);
        assert_eq!(position.debt_account_id, trove.debt);
        assert!(found[1].is_none());
    }

    #[tokio::test]
    async fn test_fetch_positions_for_owners_needs_derived_addresses() {
        // Records at non-derived addresses are invisible to point lookups
        let source = seeded();
        let found = fetch_positions_for_owners(
            &source,
            &program(),
            &[owner(1)],
            "SOL",
            100.0,
            &RatioParams::default(),
        )
        .await
        .unwrap();
        assert_eq!(found, vec![None]);
    }

    #[tokio::test]
    async fn test_fetch_positions_for_owners_rejects_foreign_records() {
        // Owner 3's records stored under owner 2's derived addresses
        let source = MemoryAccountSource::new();
        let trove = TroveAccounts::derive(&program(), &owner(2), "SOL");
        insert(&source, KeyedAccount::new(trove.debt, debt_account(3, AUSD).data));
        insert(
            &source,
            KeyedAccount::new(trove.collateral, collateral_account(3, "SOL", SOL).data),
        );
        insert(&source, KeyedAccount::new(trove.ratio, ratio_account(3, 1).data));

        let found = fetch_positions_for_owners(
            &source,
            &program(),
            &[owner(2)],
            "SOL",
            100.0,
            &RatioParams::default(),
        )
        .await
        .unwrap();
        assert_eq!(found, vec![None]);
    }

    // ===== Stake state =====

    fn stake_account(b: u8, amount: u64) -> KeyedAccount {
        let record = Record::Stake(StakeRecord {
            owner: owner(b),
            amount,
            scale_snapshot: BigUint::from(SCALE_FACTOR),
            epoch_snapshot: 0,
            last_update_block: 1,
        });
        KeyedAccount::new(address(b, 0x5a), record.encode())
    }

    fn pool_account(denom: &str, tag: u8) -> KeyedAccount {
        let record = Record::PoolSnapshot(PoolSnapshotRecord {
            denom: denom.to_string(),
            gain_factor: BigUint::from(7u32),
            total_collateral_gained: 0,
            epoch: 0,
        });
        KeyedAccount::new(address(0, tag), record.encode())
    }

    fn user_snapshot_account(b: u8, denom: &str) -> KeyedAccount {
        let record = Record::UserCollateralSnapshot(UserCollateralSnapshotRecord {
            owner: owner(b),
            denom: denom.to_string(),
            gain_factor_snapshot: BigUint::from(3u32),
            pending_gain: 0,
        });
        KeyedAccount::new(address(b, 0x55), record.encode())
    }

    #[tokio::test]
    async fn test_fetch_stake_state() {
        let source = MemoryAccountSource::new();
        insert(&source, stake_account(4, AUSD));
        insert(&source, stake_account(5, 2 * AUSD));
        insert(&source, pool_account("ETH", 0x01));
        insert(&source, pool_account("SOL", 0x02));
        insert(&source, user_snapshot_account(4, "SOL"));

        let state = fetch_stake_state(&source, &program(), &owner(4), "SOL")
            .await
            .unwrap();
        assert_eq!(state.stake.map(|s| s.amount), Some(AUSD));
        assert_eq!(state.pool.map(|p| p.denom), Some("SOL".to_string()));
        assert_eq!(state.user_snapshot.map(|u| u.owner), Some(owner(4)));
    }

    #[tokio::test]
    async fn test_fetch_stake_state_missing() {
        let source = MemoryAccountSource::new();
        insert(&source, pool_account("ETH", 0x01));

        let state = fetch_stake_state(&source, &program(), &owner(4), "SOL")
            .await
            .unwrap();
        assert!(state.stake.is_none());
        assert!(state.pool.is_none());
        assert!(state.user_snapshot.is_none());
    }

    #[tokio::test]
    async fn test_fetch_protocol_state_absent() {
        let source = seeded();
        assert!(fetch_protocol_state(&source, &program()).await.unwrap().is_none());
    }
}
