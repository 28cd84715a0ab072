//! Aerospacer Protocol Constants
//!
//! Account discriminators, PDA seeds, and protocol parameters.

/// Anchor account discriminators: `sha256("account:<Name>")[..8]`
pub mod discriminators {
    pub const USER_DEBT_AMOUNT: [u8; 8] = [102, 237, 238, 206, 72, 254, 116, 219];
    pub const USER_COLLATERAL_AMOUNT: [u8; 8] = [26, 219, 87, 11, 62, 102, 67, 77];
    pub const LIQUIDITY_THRESHOLD: [u8; 8] = [130, 0, 84, 160, 128, 62, 185, 75];
    pub const USER_STAKE_AMOUNT: [u8; 8] = [24, 122, 72, 224, 143, 207, 69, 149];
    pub const STABILITY_POOL_SNAPSHOT: [u8; 8] = [228, 218, 169, 15, 180, 68, 255, 48];
    pub const USER_COLLATERAL_SNAPSHOT: [u8; 8] = [200, 175, 128, 103, 43, 65, 72, 244];
    pub const STATE_ACCOUNT: [u8; 8] = [142, 247, 54, 95, 85, 133, 249, 103];

    /// Oracle instruction discriminator: `sha256("global:get_price")[..8]`
    pub const GET_PRICE_IX: [u8; 8] = [238, 38, 193, 106, 228, 32, 210, 33];
}

/// PDA seeds of the trove accounts
pub mod seeds {
    /// Followed by the owner
    pub const USER_DEBT_AMOUNT: &[u8] = b"user_debt_amount";
    /// Followed by the owner
    pub const LIQUIDITY_THRESHOLD: &[u8] = b"liquidity_threshold";
    /// Followed by the owner and the collateral denom
    pub const USER_COLLATERAL_AMOUNT: &[u8] = b"user_collateral_amount";
}

/// Protocol parameters
pub mod params {
    /// Minimum collateral ratio: 115% in 1e6-scaled percent
    pub const MINIMUM_COLLATERAL_RATIO: u64 = 115_000_000;

    /// One percent in the ratio domain
    pub const RATIO_ONE_PERCENT: u64 = 1_000_000;

    /// Ratio reported for a position with no debt
    pub const RATIO_SENTINEL: u64 = u64::MAX;

    /// Initial stability pool product factor P
    pub const SCALE_FACTOR: u128 = 1_000_000_000_000_000_000;

    /// P below this starts a new epoch
    pub const EPOCH_RESET_THRESHOLD: u128 = 1_000_000_000;

    pub const MAX_TROVES_PER_REDEMPTION: usize = 3;

    /// Redemption fee (5%)
    pub const REDEMPTION_FEE_BPS: u64 = 500;

    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Troves per `liquidate_troves` instruction
    pub const MAX_LIQUIDATION_BATCH_SIZE: usize = 50;

    /// Significant digits kept when quantizing a float USD price
    pub const PRICE_SIGNIFICANT_DIGITS: usize = 8;

    /// Ratio records are quoted against micro-USD collateral values
    pub const PRICE_DECIMALS: u32 = 6;

    pub const SOL_DECIMALS: u32 = 9;
    pub const AUSD_DECIMALS: u32 = 18;
}
