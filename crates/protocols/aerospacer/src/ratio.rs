//! Collateralization Ratio Calculator
//!
//! Pure math, no I/O. Ratios are 1e6-scaled percent (115% = 115_000_000),
//! the same domain the on-chain `LiquidityThreshold` records use.
//!
//! # Formula
//!
//! ```text
//! value_micro_usd = floor(collateral * price / 10^price_decimals)
//! ratio           = floor(value_micro_usd * 10^(debt_decimals + 2) / debt)
//! ```
//!
//! With SOL (9 decimals) and aUSD (18 decimals) the second factor is
//! 10^20, matching the program's chunked long division. All intermediates
//! are BigUint.

use aerospacer_core::units::pow10;
use aerospacer_core::AppConfig;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::constants::params;
use crate::decode::OraclePrice;

/// Decimal exponents the ratio formula depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioParams {
    pub collateral_decimals: u32,
    pub debt_decimals: u32,
}

impl Default for RatioParams {
    fn default() -> Self {
        Self {
            collateral_decimals: params::SOL_DECIMALS,
            debt_decimals: params::AUSD_DECIMALS,
        }
    }
}

impl RatioParams {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            collateral_decimals: config.collateral_decimals,
            debt_decimals: config.debt_decimals,
        }
    }
}

/// Quantize a float USD price to micro-USD.
///
/// The price is first rounded to [`params::PRICE_SIGNIFICANT_DIGITS`]
/// significant digits, then scaled to micro-USD in integer arithmetic
/// (half away from zero). Non-finite or non-positive prices give 0.
pub fn quantize_price(price_usd: f64) -> u64 {
    if !price_usd.is_finite() || price_usd <= 0.0 {
        return 0;
    }

    let sig = params::PRICE_SIGNIFICANT_DIGITS;
    let formatted = format!("{:.*e}", sig - 1, price_usd);
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return 0;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return 0;
    };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let Ok(digits) = digits.parse::<u128>() else {
        return 0;
    };

    // digits * 10^(exponent - (sig - 1)) USD, expressed in micro-USD
    let shift = exponent - (sig as i32 - 1) + params::PRICE_DECIMALS as i32;
    if shift >= 0 {
        10u128
            .checked_pow(shift as u32)
            .and_then(|scale| digits.checked_mul(scale))
            .map(|micro| micro.min(u64::MAX as u128) as u64)
            .unwrap_or(u64::MAX)
    } else {
        let Some(divisor) = 10u128.checked_pow(shift.unsigned_abs()) else {
            return 0;
        };
        ((digits + divisor / 2) / divisor) as u64
    }
}

/// Collateral value in micro-USD: `floor(amount * price / 10^price_decimals)`
pub fn collateral_value(amount: &BigUint, price: u64, price_decimals: u32) -> BigUint {
    amount * BigUint::from(price) / pow10(price_decimals)
}

/// Ratio from a micro-USD collateral value.
///
/// Saturates one below [`params::RATIO_SENTINEL`] so a funded position is
/// never mistaken for a debt-free one.
pub fn ratio_from_value(
    value_micro_usd: &BigUint,
    debt: &BigUint,
    ratio_params: &RatioParams,
) -> u64 {
    if debt.is_zero() {
        return params::RATIO_SENTINEL;
    }
    let ratio = value_micro_usd * pow10(ratio_params.debt_decimals + 2) / debt;
    ratio
        .to_u64()
        .map(|r| r.min(params::RATIO_SENTINEL - 1))
        .unwrap_or(params::RATIO_SENTINEL - 1)
}

/// Position ratio from a float USD price
pub fn compute_ratio(
    collateral: u64,
    debt: u64,
    price_usd: f64,
    ratio_params: &RatioParams,
) -> u64 {
    if debt == 0 {
        return params::RATIO_SENTINEL;
    }
    let value = collateral_value(
        &BigUint::from(collateral),
        quantize_price(price_usd),
        ratio_params.collateral_decimals,
    );
    ratio_from_value(&value, &BigUint::from(debt), ratio_params)
}

/// Position ratio from the oracle's integer answer, exactly as the program computes it
pub fn compute_ratio_from_oracle(
    collateral: u64,
    debt: u64,
    price: &OraclePrice,
    ratio_params: &RatioParams,
) -> u64 {
    if debt == 0 {
        return params::RATIO_SENTINEL;
    }
    let Ok(raw) = u64::try_from(price.price) else {
        return 0;
    };
    let value = collateral_value(&BigUint::from(collateral), raw, price.decimal as u32);
    ratio_from_value(&value, &BigUint::from(debt), ratio_params)
}

/// Total collateral ratio across all positions
pub fn system_ratio(
    total_collateral: u128,
    total_debt: u128,
    price_usd: f64,
    ratio_params: &RatioParams,
) -> u64 {
    let value = collateral_value(
        &BigUint::from(total_collateral),
        quantize_price(price_usd),
        ratio_params.collateral_decimals,
    );
    ratio_from_value(&value, &BigUint::from(total_debt), ratio_params)
}

/// Ratio as a human percentage, e.g. 115_000_000 -> 115.0
pub fn ratio_to_percent(ratio: u64) -> f64 {
    ratio as f64 / params::RATIO_ONE_PERCENT as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL: u64 = 1_000_000_000;
    const AUSD: u64 = 1_000_000_000_000_000_000;

    // ===== Price quantization =====

    #[test]
    fn test_quantize_round_prices() {
        assert_eq!(quantize_price(100.0), 100_000_000);
        assert_eq!(quantize_price(1.5), 1_500_000);
    }

    #[test]
    fn test_quantize_keeps_eight_significant_digits() {
        // 150.123456789 -> 150.12346
        assert_eq!(quantize_price(150.123456789), 150_123_460);
        // 0.000123456789 -> 0.00012345679 -> 123 micro (rounded)
        assert_eq!(quantize_price(0.000123456789), 123);
    }

    #[test]
    fn test_quantize_invalid_prices() {
        assert_eq!(quantize_price(0.0), 0);
        assert_eq!(quantize_price(-5.0), 0);
        assert_eq!(quantize_price(f64::NAN), 0);
        assert_eq!(quantize_price(f64::INFINITY), 0);
    }

    #[test]
    fn test_quantize_huge_price_saturates() {
        assert_eq!(quantize_price(1e300), u64::MAX);
    }

    // ===== Ratio =====

    #[test]
    fn test_zero_debt_sentinel() {
        let p = RatioParams::default();
        assert_eq!(compute_ratio(SOL, 0, 150.0, &p), params::RATIO_SENTINEL);
    }

    #[test]
    fn test_ratio_examples() {
        let p = RatioParams::default();
        // 0.1 SOL @ $100 against 10 aUSD = 100%
        assert_eq!(compute_ratio(SOL / 10, 10 * AUSD, 100.0, &p), 100_000_000);
        // 0.15 SOL @ $150 against 10 aUSD = 225%
        assert_eq!(compute_ratio(3 * SOL / 20, 10 * AUSD, 150.0, &p), 225_000_000);
        // 0.1 SOL @ $115 against 10 aUSD sits exactly on the threshold
        assert_eq!(
            compute_ratio(SOL / 10, 10 * AUSD, 115.0, &p),
            params::MINIMUM_COLLATERAL_RATIO
        );
    }

    #[test]
    fn test_ratio_floors() {
        let p = RatioParams::default();
        // $1 against 3 aUSD = 33.333...%
        assert_eq!(compute_ratio(SOL, 3 * AUSD, 1.0, &p), 33_333_333);
    }

    #[test]
    fn test_ratio_saturates_below_sentinel() {
        let p = RatioParams::default();
        assert_eq!(
            compute_ratio(u64::MAX, 1, 1_000_000.0, &p),
            params::RATIO_SENTINEL - 1
        );
    }

    #[test]
    fn test_ratio_monotonic_in_collateral() {
        let p = RatioParams::default();
        let low = compute_ratio(SOL, 10 * AUSD, 123.45, &p);
        let high = compute_ratio(2 * SOL, 10 * AUSD, 123.45, &p);
        assert!(high > low);
    }

    #[test]
    fn test_oracle_path_matches_float_path() {
        let p = RatioParams::default();
        // $150 at exponent -8; decimal 11 turns lamports * price into micro-USD
        let oracle = OraclePrice {
            denom: "SOL".to_string(),
            price: 15_000_000_000,
            decimal: 11,
            timestamp: 0,
            confidence: 0,
            exponent: -8,
        };
        let debt = 10 * AUSD;
        assert_eq!(compute_ratio_from_oracle(SOL, debt, &oracle, &p), 1_500_000_000);
        assert_eq!(
            compute_ratio_from_oracle(SOL, debt, &oracle, &p),
            compute_ratio(SOL, debt, oracle.usd(), &p)
        );
    }

    #[test]
    fn test_oracle_negative_price() {
        let oracle = OraclePrice {
            denom: "SOL".to_string(),
            price: -1,
            decimal: 11,
            timestamp: 0,
            confidence: 0,
            exponent: -8,
        };
        assert_eq!(
            compute_ratio_from_oracle(SOL, AUSD, &oracle, &RatioParams::default()),
            0
        );
    }

    #[test]
    fn test_system_ratio() {
        let p = RatioParams::default();
        let total_collateral = 10 * SOL as u128;
        let total_debt = 500 * AUSD as u128;
        // $1000 of collateral against 500 aUSD
        assert_eq!(system_ratio(total_collateral, total_debt, 100.0, &p), 200_000_000);
        assert_eq!(ratio_to_percent(200_000_000), 200.0);
    }
}
