pub mod retry;

use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Convert a raw integer token amount to display units at the given decimals.
/// Lossy by design; only used at the display boundary.
pub fn raw_to_units(raw: &BigUint, decimals: u8) -> f64 {
    let value = raw.to_f64().unwrap_or(f64::MAX);
    value / 10f64.powi(decimals as i32)
}

/// Convert display units back to a raw integer amount, truncating fractional
/// dust below the smallest denomination.
pub fn units_to_raw(units: f64, decimals: u8) -> BigUint {
    if units <= 0.0 || !units.is_finite() {
        return BigUint::from(0u32);
    }
    let scaled = units * 10f64.powi(decimals as i32);
    BigUint::from(scaled as u128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_units_round_trip() {
        let raw = BigUint::from(1_500_000_000_000_000_000u64);
        assert!((raw_to_units(&raw, 18) - 1.5).abs() < 1e-9);

        let back = units_to_raw(2.5, 6);
        assert_eq!(back, BigUint::from(2_500_000u32));
    }

    #[test]
    fn test_units_to_raw_negative_is_zero() {
        assert_eq!(units_to_raw(-1.0, 18), BigUint::from(0u32));
    }
}
