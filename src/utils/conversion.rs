//! Conversions between raw chain integers and decimal USD amounts.
//!
//! All monetary math runs on [`BigDecimal`] with explicit round-toward-zero
//! truncation to 18 fractional digits at monetary boundaries. Raw `U256`
//! amounts are scaled by token decimals without ever passing through `f64`.

use alloy::primitives::U256;
use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use once_cell::sync::Lazy;
use std::str::FromStr;

/// Monetary values carry at most 18 fractional digits.
const MONETARY_SCALE: i64 = 18;

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u8) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp as u32))
    }
}

/// Scale a raw `U256` token amount down by `decimals` decimal places.
///
/// Conversion goes through `BigInt` bytes so full precision is preserved;
/// the division is exact (power of ten), no rounding occurs here.
pub fn u256_to_scaled(value: U256, decimals: u8) -> BigDecimal {
    let bytes: [u8; 32] = value.to_le_bytes();
    let big_int = BigInt::from_bytes_le(num_bigint::Sign::Plus, &bytes);
    let big_value = BigDecimal::from(big_int);

    if decimals == 0 {
        big_value
    } else {
        big_value / big_pow10(decimals)
    }
}

/// Truncate a decimal to 18 fractional digits, rounding toward zero.
///
/// Applied after every multiplication chain or division that crosses a
/// monetary boundary; never rounds up, so sums of truncated shares can fall
/// short of the untruncated total by at most 1e-18 per term.
pub fn truncate18(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(MONETARY_SCALE, RoundingMode::Down)
}

/// Lift an `f64` (e.g. a market-API price sample) into a `BigDecimal`.
///
/// Goes through the shortest decimal rendering rather than the exact binary
/// expansion, so `2.05_f64` becomes `2.05` and not a 50-digit artifact.
/// Non-finite inputs yield zero.
pub fn bdec(value: f64) -> BigDecimal {
    if !value.is_finite() {
        return BigDecimal::from(0);
    }
    BigDecimal::from_str(&value.to_string()).unwrap_or_else(|_| BigDecimal::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_wei_to_units() {
        let one_ether = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(u256_to_scaled(one_ether, 18), BigDecimal::from(1));
    }

    #[test]
    fn scales_with_nonstandard_decimals() {
        // 123.456 with 6 decimals (USDC style)
        let raw = U256::from(123_456_000u64);
        assert_eq!(
            u256_to_scaled(raw, 6),
            BigDecimal::from_str("123.456").unwrap()
        );
    }

    #[test]
    fn zero_decimals_is_identity() {
        let raw = U256::from(42u64);
        assert_eq!(u256_to_scaled(raw, 0), BigDecimal::from(42));
    }

    #[test]
    fn truncation_rounds_toward_zero() {
        let v = BigDecimal::from_str("0.9999999999999999999").unwrap();
        assert_eq!(
            truncate18(&v),
            BigDecimal::from_str("0.999999999999999999").unwrap()
        );
    }

    #[test]
    fn truncation_never_rounds_up() {
        let v = BigDecimal::from_str("1.0000000000000000009").unwrap();
        assert_eq!(truncate18(&v), BigDecimal::from_str("1").unwrap());
    }

    #[test]
    fn truncation_keeps_short_values_equal() {
        let v = BigDecimal::from_str("300").unwrap();
        assert_eq!(truncate18(&v), v);
    }

    #[test]
    fn bdec_uses_shortest_rendering() {
        assert_eq!(bdec(2.05), BigDecimal::from_str("2.05").unwrap());
        assert_eq!(bdec(0.0), BigDecimal::from(0));
    }

    #[test]
    fn bdec_rejects_non_finite() {
        assert_eq!(bdec(f64::NAN), BigDecimal::from(0));
        assert_eq!(bdec(f64::INFINITY), BigDecimal::from(0));
    }
}
