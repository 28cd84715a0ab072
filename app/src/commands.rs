//! Command handlers
//!
//! Each handler reads from an [`AccountSource`] and returns the JSON it
//! would print.

use aerospacer::liquidation::{liquidation_summary, LiquidationBatch};
use aerospacer::redemption::{available_liquidity, net_redemption_amount, plan_redemption};
use aerospacer::sorted::{find_neighbors, position_of, Candidate};
use aerospacer::{
    fetch_positions, fetch_protocol_state, fetch_stake_state, liquidity_threshold_address, sort,
    LedgerSnapshot, Position, RatioParams, StakeView,
};
use aerospacer_core::units::parse_decimal;
use aerospacer_core::{AccountId, AppConfig};
use aerospacer_rpc::AccountSource;
use anyhow::{Context, Result};
use num_bigint::BigUint;
use serde_json::{json, Value};

fn to_u64(value: BigUint, what: &str) -> Result<u64> {
    u64::try_from(value).with_context(|| format!("{} does not fit in 64 bits", what))
}

async fn ordered_ledger(
    source: &dyn AccountSource,
    config: &AppConfig,
    price_usd: f64,
) -> Result<Vec<Position>> {
    let positions = fetch_positions(
        source,
        &config.protocol_program()?,
        &config.collateral_denom,
        price_usd,
        &RatioParams::from_config(config),
    )
    .await
    .context("fetching troves")?;
    Ok(sort(positions))
}

pub async fn troves(source: &dyn AccountSource, config: &AppConfig, price_usd: f64) -> Result<Value> {
    let ordered = ordered_ledger(source, config, price_usd).await?;
    let snapshot = LedgerSnapshot::from_positions(
        &config.collateral_denom,
        ordered,
        price_usd,
        config.liquidation_threshold,
        &RatioParams::from_config(config),
    );
    Ok(serde_json::to_value(&snapshot)?)
}

pub async fn liquidatable(
    source: &dyn AccountSource,
    config: &AppConfig,
    price_usd: f64,
) -> Result<Value> {
    let ordered = ordered_ledger(source, config, price_usd).await?;
    let threshold = config.liquidation_threshold;
    let batches = LiquidationBatch::plan(&ordered, threshold, config.max_liquidation_batch);

    Ok(json!({
        "threshold": threshold,
        "summary": liquidation_summary(&ordered, threshold),
        "batches": batches,
    }))
}

pub async fn hints(
    source: &dyn AccountSource,
    config: &AppConfig,
    price_usd: f64,
    owner: AccountId,
    collateral: &str,
    debt: &str,
) -> Result<Value> {
    let collateral = to_u64(parse_decimal(collateral, config.collateral_decimals)?, "collateral")?;
    let debt = to_u64(parse_decimal(debt, config.debt_decimals)?, "debt")?;
    let ordered = ordered_ledger(source, config, price_usd).await?;

    let ratio_account_id = match position_of(&owner, &ordered) {
        Some(i) => ordered[i].ratio_account_id,
        None => liquidity_threshold_address(&config.protocol_program()?, &owner),
    };
    let candidate = Candidate::from_amounts(
        owner,
        ratio_account_id,
        collateral,
        debt,
        price_usd,
        &RatioParams::from_config(config),
    );
    let neighbors = find_neighbors(&candidate, &ordered);
    neighbors
        .validate(candidate.ratio)
        .context("neighbor ordering check")?;

    Ok(json!({
        "owner": owner,
        "ratio_account": candidate.ratio_account_id,
        "ratio": candidate.ratio,
        "below_threshold": candidate.ratio < config.liquidation_threshold,
        "prev": neighbors.prev,
        "next": neighbors.next,
        "hint_accounts": neighbors.to_hint_accounts(),
    }))
}

pub async fn redeem(
    source: &dyn AccountSource,
    config: &AppConfig,
    price_usd: f64,
    amount: &str,
) -> Result<Value> {
    let gross = to_u64(parse_decimal(amount, config.debt_decimals)?, "amount")?;
    let net = net_redemption_amount(gross, config.redemption_fee_bps);
    let ordered = ordered_ledger(source, config, price_usd).await?;
    let plan = plan_redemption(&ordered, net, config.max_redemption_troves);

    Ok(json!({
        "gross": gross.to_string(),
        "fee": (gross - net).to_string(),
        "available": available_liquidity(&ordered, config.max_redemption_troves).to_string(),
        "fully_covered": plan.is_fully_covered(),
        "plan": plan,
    }))
}

pub async fn stake(source: &dyn AccountSource, config: &AppConfig, owner: AccountId) -> Result<Value> {
    let program = config.protocol_program()?;
    let state = fetch_stake_state(source, &program, &owner, &config.collateral_denom)
        .await
        .context("fetching stake")?;
    let protocol = fetch_protocol_state(source, &program)
        .await
        .context("fetching protocol state")?;

    let view = StakeView::from_state(
        &state,
        &config.collateral_denom,
        protocol.as_ref(),
        &RatioParams::from_config(config),
    )?;
    Ok(serde_json::to_value(&view)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerospacer::decode::{CollateralRecord, DebtRecord, RatioRecord, Record};
    use aerospacer_rpc::MemoryAccountSource;

    const SOL: u64 = 1_000_000_000;
    const AUSD: u64 = 1_000_000_000_000_000_000;

    fn id(b: u8, tag: u8) -> AccountId {
        let mut bytes = [b; 32];
        bytes[0] = tag;
        AccountId::new(bytes)
    }

    fn trove(source: &MemoryAccountSource, program: AccountId, b: u8, coll: u64, debt: u64) {
        let owner = AccountId::new([b; 32]);
        let records = [
            (
                0xd0,
                Record::Debt(DebtRecord {
                    owner,
                    amount: debt,
                }),
            ),
            (
                0xc0,
                Record::Collateral(CollateralRecord {
                    owner,
                    denom: "SOL".to_string(),
                    amount: coll,
                }),
            ),
            (0xa0, Record::Ratio(RatioRecord { owner, ratio: 0 })),
        ];
        for (tag, record) in records {
            source.insert(program, id(b, tag), record.encode());
        }
    }

    fn setup() -> (MemoryAccountSource, AppConfig) {
        let config = AppConfig::default();
        let program = config.protocol_program().unwrap();
        let source = MemoryAccountSource::new();
        // $100 SOL: 110%, 150%, 300%
        trove(&source, program, 1, 11 * SOL / 100, 10 * AUSD);
        trove(&source, program, 2, 15 * SOL / 100, 10 * AUSD);
        trove(&source, program, 3, 3 * SOL / 100, AUSD);
        (source, config)
    }

    #[tokio::test]
    async fn test_troves_output() {
        let (source, config) = setup();
        let out = troves(&source, &config, 100.0).await.unwrap();
        let positions = out["positions"].as_array().unwrap();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[0]["ratio"], 110_000_000);
        assert_eq!(positions[2]["ratio"], 300_000_000);
        assert_eq!(out["liquidatable"], 1);
    }

    #[tokio::test]
    async fn test_liquidatable_output() {
        let (source, config) = setup();
        let out = liquidatable(&source, &config, 100.0).await.unwrap();
        assert_eq!(out["summary"]["count"], 1);
        let batches = out["batches"].as_array().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0]["remaining_accounts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_hints_output() {
        let (source, config) = setup();
        // 0.2 SOL against 10 aUSD at $100 = 200%, between troves 2 and 3
        let new_owner = AccountId::new([9; 32]);
        let out = hints(&source, &config, 100.0, new_owner, "0.2", "10")
            .await
            .unwrap();
        assert_eq!(out["ratio"], 200_000_000);
        assert_eq!(out["prev"], id(2, 0xa0).to_string());
        assert_eq!(out["next"], id(3, 0xa0).to_string());
        assert_eq!(out["hint_accounts"].as_array().unwrap().len(), 2);

        let program = config.protocol_program().unwrap();
        let derived = liquidity_threshold_address(&program, &new_owner);
        assert_ne!(derived, AccountId::default());
        assert_eq!(out["ratio_account"], derived.to_string());
    }

    #[tokio::test]
    async fn test_hints_keeps_existing_ratio_account() {
        let (source, config) = setup();
        let out = hints(&source, &config, 100.0, AccountId::new([2; 32]), "0.2", "10")
            .await
            .unwrap();
        assert_eq!(out["ratio_account"], id(2, 0xa0).to_string());
        // Trove 2 leaves its own slot and lands between troves 1 and 3
        assert_eq!(out["prev"], id(1, 0xa0).to_string());
        assert_eq!(out["next"], id(3, 0xa0).to_string());
    }

    #[tokio::test]
    async fn test_hints_rejects_bad_amount() {
        let (source, config) = setup();
        let owner = AccountId::new([9; 32]);
        assert!(hints(&source, &config, 100.0, owner, "abc", "1").await.is_err());
    }

    #[tokio::test]
    async fn test_redeem_output() {
        let (source, config) = setup();
        let out = redeem(&source, &config, 100.0, "1").await.unwrap();
        // 5% fee leaves 0.95 aUSD, all from the riskiest trove
        assert_eq!(out["fee"], "50000000000000000");
        assert_eq!(out["fully_covered"], true);
        assert_eq!(out["plan"]["steps"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stake_without_deposit_is_null() {
        let (source, config) = setup();
        let out = stake(&source, &config, AccountId::new([1; 32])).await.unwrap();
        assert!(out.is_null());
    }
}
