//! Fixed-point price helpers (scale 10^8, same as the contract)

/// On-chain price scale
pub const PRICE_SCALE: f64 = 100_000_000.0;

/// Encode a USD price as `floor(price * 10^8)`.
///
/// 0 means "unset" on-chain, so a positive price that floors to 0 is clamped
/// to 1. Non-finite and non-positive prices encode to 0.
pub fn to_fixed_point(price: f64) -> u64 {
    if !price.is_finite() || price <= 0.0 {
        return 0;
    }
    let scaled = (price * PRICE_SCALE).floor();
    if scaled >= u64::MAX as f64 {
        return u64::MAX;
    }
    (scaled as u64).max(1)
}

/// Decode a fixed-point price (display only)
pub fn from_fixed_point(value: u64) -> f64 {
    value as f64 / PRICE_SCALE
}

/// Signed fractional change `(current - entry) / entry`; `None` without an entry price
pub fn variation(entry: u64, current: u64) -> Option<f64> {
    if entry == 0 {
        return None;
    }
    Some((current as f64 - entry as f64) / entry as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point_floors() {
        assert_eq!(to_fixed_point(120.0), 12_000_000_000);
        assert_eq!(to_fixed_point(0.123456789), 12_345_678);
        assert_eq!(to_fixed_point(1.0), 100_000_000);
    }

    #[test]
    fn test_tiny_positive_price_clamps_to_one() {
        assert_eq!(to_fixed_point(0.000_000_001), 1);
        assert_eq!(to_fixed_point(f64::MIN_POSITIVE), 1);
    }

    #[test]
    fn test_unusable_prices_are_unset() {
        assert_eq!(to_fixed_point(0.0), 0);
        assert_eq!(to_fixed_point(-3.5), 0);
        assert_eq!(to_fixed_point(f64::NAN), 0);
        assert_eq!(to_fixed_point(f64::INFINITY), 0);
    }

    #[test]
    fn test_variation() {
        assert_eq!(variation(100, 120), Some(0.2));
        assert_eq!(variation(200, 190), Some(-0.05));
        assert_eq!(variation(0, 190), None);
        assert_eq!(from_fixed_point(12_000_000_000), 120.0);
    }
}
