//! Fixed-point unit conversion
//!
//! Conversions between minor-unit integers and decimal strings, plus
//! reconstruction of 128-bit values stored as two 64-bit limbs.
//! All amount math is integer; `f64` only enters through [`from_f64`]
//! for inputs that are already lossy (USD prices, user-typed floats).
//!
//! Rounding is truncation toward zero everywhere.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::ProtocolError;

/// Format `amount` minor units as a decimal string.
///
/// The fraction is truncated to `precision` digits and trailing zeros are
/// stripped; the integer part is kept in full regardless of width.
pub fn to_decimal_string(amount: &BigInt, decimals: u32, precision: u32) -> String {
    let sign = if amount.sign() == Sign::Minus { "-" } else { "" };
    let digits = amount.magnitude().to_str_radix(10);

    if decimals == 0 {
        return format!("{}{}", sign, digits);
    }

    let decimals = decimals as usize;
    let padded = if digits.len() < decimals + 1 {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (integer_part, fractional_part) = padded.split_at(padded.len() - decimals);
    let keep = (precision as usize).min(decimals);
    let fractional = fractional_part[..keep].trim_end_matches('0');

    if fractional.is_empty() {
        format!("{}{}", sign, integer_part)
    } else {
        format!("{}{}.{}", sign, integer_part, fractional)
    }
}

/// Unsigned convenience wrapper around [`to_decimal_string`]
pub fn format_units(amount: u64, decimals: u32, precision: u32) -> String {
    to_decimal_string(&BigInt::from(amount), decimals, precision)
}

/// Parse a non-negative decimal string into minor units.
///
/// Fraction digits beyond `decimals` are truncated.
pub fn parse_decimal(input: &str, decimals: u32) -> Result<BigUint, ProtocolError> {
    let s = input.trim();
    let invalid = |reason: &str| ProtocolError::InvalidAmount {
        message: format!("{:?}: {}", input, reason),
    };

    if s.is_empty() {
        return Err(invalid("empty amount"));
    }

    let (integer_part, fractional_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    if integer_part.is_empty() && fractional_part.is_empty() {
        return Err(invalid("no digits"));
    }
    if fractional_part.contains('.') {
        return Err(invalid("multiple decimal points"));
    }
    if !integer_part
        .bytes()
        .chain(fractional_part.bytes())
        .all(|b| b.is_ascii_digit())
    {
        return Err(invalid("non-digit character"));
    }

    let decimals = decimals as usize;
    let mut fraction: String = fractional_part.chars().take(decimals).collect();
    while fraction.len() < decimals {
        fraction.push('0');
    }

    let combined = format!("{}{}", integer_part, fraction);
    if combined.is_empty() {
        return Ok(BigUint::zero());
    }
    BigUint::parse_bytes(combined.as_bytes(), 10).ok_or_else(|| invalid("unparseable"))
}

/// Convert a lossy float input into minor units
pub fn from_f64(value: f64, decimals: u32) -> Result<BigUint, ProtocolError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ProtocolError::InvalidAmount {
            message: format!("cannot convert {} to minor units", value),
        });
    }
    parse_decimal(&format!("{:.*}", decimals as usize, value), decimals)
}

/// Reconstruct a u128 stored as two little-endian u64 limbs, low first
pub fn u128_from_limbs(low: u64, high: u64) -> BigUint {
    (BigUint::from(high) << 64u32) | BigUint::from(low)
}

/// Split a value into `(low, high)` limbs; `None` if it needs more than 128 bits
pub fn u128_to_limbs(value: &BigUint) -> Option<(u64, u64)> {
    if value.bits() > 128 {
        return None;
    }
    let mask = BigUint::from(u64::MAX);
    let low = (value & &mask).to_u64()?;
    let high = (value >> 64u32).to_u64()?;
    Some((low, high))
}

pub fn biguint_to_u64_saturating(value: &BigUint) -> u64 {
    value.to_u64().unwrap_or(u64::MAX)
}

/// `10^exp` as a BigUint
pub fn pow10(exp: u32) -> BigUint {
    num_traits::pow(BigUint::from(10u32), exp as usize)
}
