// Odds representations and conversions between fractional and decimal form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Largest denominator the decimal -> fraction approximation will produce
pub const MAX_FRACTION_DENOMINATOR: u32 = 1000;

/// Stop refining the approximation once it is this close to the target
pub const FRACTION_TOLERANCE: f64 = 1e-4;

/// An odd as displayed by a provider: either fractional ("5/2") or decimal (3.50).
///
/// A decimal odd includes the returned stake, so `5/2` and `3.5` describe the
/// same price. They are still different values: equality and hashing look at
/// the representation first and the payload second.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OddFormat {
    Fraction { numerator: u32, denominator: u32 },
    Decimal { odd: f64 },
}

impl OddFormat {
    pub fn from_decimal(odd: f64) -> Self {
        OddFormat::Decimal { odd }
    }

    pub fn from_fraction(numerator: u32, denominator: u32) -> Self {
        OddFormat::Fraction { numerator, denominator }
    }

    /// Decimal odd including stake. A zero denominator yields `inf`/`NaN`.
    pub fn decimal_value(&self) -> f64 {
        match *self {
            OddFormat::Fraction { numerator, denominator } => {
                numerator as f64 / denominator as f64 + 1.0
            }
            OddFormat::Decimal { odd } => odd,
        }
    }

    /// Fractional odd as (numerator, denominator).
    ///
    /// For the decimal form this is the best rational approximation of
    /// `odd - 1.0`; rebuilding a decimal odd from the result lands within
    /// 1e-3 of the original for any price with a denominator up to
    /// [`MAX_FRACTION_DENOMINATOR`].
    pub fn fractional_odd(&self) -> (u32, u32) {
        match *self {
            OddFormat::Fraction { numerator, denominator } => (numerator, denominator),
            OddFormat::Decimal { odd } => {
                best_rational_approximation(odd - 1.0, MAX_FRACTION_DENOMINATOR, FRACTION_TOLERANCE)
            }
        }
    }

    pub fn to_fraction(&self) -> OddFormat {
        let (numerator, denominator) = self.fractional_odd();
        OddFormat::Fraction { numerator, denominator }
    }

    pub fn to_decimal(&self) -> OddFormat {
        OddFormat::Decimal { odd: self.decimal_value() }
    }

    pub fn is_fraction(&self) -> bool {
        matches!(self, OddFormat::Fraction { .. })
    }
}

impl PartialEq for OddFormat {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                OddFormat::Fraction { numerator: n1, denominator: d1 },
                OddFormat::Fraction { numerator: n2, denominator: d2 },
            ) => n1 == n2 && d1 == d2,
            // Bitwise so that Eq and Hash agree
            (OddFormat::Decimal { odd: a }, OddFormat::Decimal { odd: b }) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for OddFormat {}

impl Hash for OddFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match *self {
            OddFormat::Fraction { numerator, denominator } => {
                0u8.hash(state);
                numerator.hash(state);
                denominator.hash(state);
            }
            OddFormat::Decimal { odd } => {
                1u8.hash(state);
                odd.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for OddFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            OddFormat::Fraction { numerator, denominator } => write!(f, "{}/{}", numerator, denominator),
            OddFormat::Decimal { odd } => write!(f, "{:.2}", odd),
        }
    }
}

/// Continued-fraction approximation of a positive value.
///
/// Walks the convergents of `value` until the next one would exceed
/// `max_denominator` or the current one is within `tolerance`.
/// Non-finite or non-positive values map to `(0, 1)`; values whose integer
/// part does not fit a `u32` saturate to `(u32::MAX, 1)`.
pub fn best_rational_approximation(value: f64, max_denominator: u32, tolerance: f64) -> (u32, u32) {
    if !value.is_finite() || value <= 0.0 {
        return (0, 1);
    }

    let max_denominator = u64::from(max_denominator.max(1));
    // h(-2)=0, h(-1)=1 and k(-2)=1, k(-1)=0
    let (mut h_prev, mut h) = (0u64, 1u64);
    let (mut k_prev, mut k) = (1u64, 0u64);
    let mut best = (0u64, 1u64);
    let mut x = value;

    loop {
        let a = x.floor() as u64;
        let h_next = match a.checked_mul(h).and_then(|v| v.checked_add(h_prev)) {
            Some(v) => v,
            None => break,
        };
        let k_next = match a.checked_mul(k).and_then(|v| v.checked_add(k_prev)) {
            Some(v) => v,
            None => break,
        };
        if h_next > u64::from(u32::MAX) && k == 0 {
            // First convergent already overflows
            return (u32::MAX, 1);
        }
        if k_next > max_denominator || h_next > u64::from(u32::MAX) {
            break;
        }

        h_prev = h;
        h = h_next;
        k_prev = k;
        k = k_next;
        best = (h, k);

        if (h as f64 / k as f64 - value).abs() < tolerance {
            break;
        }
        let remainder = x - x.floor();
        if remainder < 1e-12 {
            break;
        }
        x = 1.0 / remainder;
    }

    (best.0 as u32, best.1.max(1) as u32)
}

/// Product of the decimal values of every odd, 1.0 for an empty slice.
pub fn combined_decimal_odd<'a, I>(odds: I) -> f64
where
    I: IntoIterator<Item = &'a OddFormat>,
{
    odds.into_iter().map(OddFormat::decimal_value).product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn round_trip(v: f64) -> f64 {
        let (n, d) = OddFormat::from_decimal(v).fractional_odd();
        OddFormat::from_fraction(n, d).decimal_value()
    }

    #[test]
    fn test_fraction_decimal_value_includes_stake() {
        assert!((OddFormat::from_fraction(5, 2).decimal_value() - 3.5).abs() < 1e-12);
        assert!((OddFormat::from_fraction(1, 1).decimal_value() - 2.0).abs() < 1e-12);
        assert!((OddFormat::from_decimal(1.91).decimal_value() - 1.91).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominator_follows_float_semantics() {
        assert!(OddFormat::from_fraction(3, 0).decimal_value().is_infinite());
        assert!(OddFormat::from_fraction(0, 0).decimal_value().is_nan());
    }

    #[test]
    fn test_fraction_is_returned_unchanged() {
        assert_eq!(OddFormat::from_fraction(10, 4).fractional_odd(), (10, 4));
    }

    #[test]
    fn test_decimal_to_fraction_known_prices() {
        assert_eq!(OddFormat::from_decimal(3.5).fractional_odd(), (5, 2));
        assert_eq!(OddFormat::from_decimal(2.0).fractional_odd(), (1, 1));
        assert_eq!(OddFormat::from_decimal(1.5).fractional_odd(), (1, 2));
        assert_eq!(OddFormat::from_decimal(1.25).fractional_odd(), (1, 4));
        assert_eq!(OddFormat::from_decimal(11.0).fractional_odd(), (10, 1));
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        for d in 1..=40u32 {
            for n in 1..=60u32 {
                let v = n as f64 / d as f64 + 1.0;
                let back = round_trip(v);
                assert!((back - v).abs() < 1e-3, "v={} back={}", v, back);
            }
        }
        for v in [1.01, 1.33, 1.91, 2.37, 4.333, 7.77, 101.0] {
            assert!((round_trip(v) - v).abs() < 1e-3, "v={}", v);
        }
    }

    #[test]
    fn test_degenerate_decimal_inputs() {
        assert_eq!(OddFormat::from_decimal(1.0).fractional_odd(), (0, 1));
        assert_eq!(OddFormat::from_decimal(0.5).fractional_odd(), (0, 1));
        assert_eq!(OddFormat::from_decimal(f64::NAN).fractional_odd(), (0, 1));
        assert_eq!(OddFormat::from_decimal(f64::INFINITY).fractional_odd(), (0, 1));
    }

    #[test]
    fn test_oversized_decimal_saturates() {
        assert_eq!(OddFormat::from_decimal(5_000_000_001.0).fractional_odd(), (u32::MAX, 1));
        assert_eq!(OddFormat::from_decimal(1e30).fractional_odd(), (u32::MAX, 1));
        // Largest price that still fits is exact
        let v = u32::MAX as f64 + 1.0;
        assert_eq!(OddFormat::from_decimal(v).fractional_odd(), (u32::MAX, 1));
        assert_eq!(best_rational_approximation(4_000_000_000.5, 1000, 1e-4), (4_000_000_000, 1));
    }

    #[test]
    fn test_equality_distinguishes_representation() {
        let fraction = OddFormat::from_fraction(5, 2);
        let decimal = OddFormat::from_decimal(3.5);
        assert_eq!(fraction.decimal_value(), decimal.decimal_value());
        assert_ne!(fraction, decimal);
        assert_eq!(fraction, OddFormat::from_fraction(5, 2));
        assert_ne!(fraction, OddFormat::from_fraction(10, 4));

        let set: HashSet<OddFormat> = [fraction, decimal, OddFormat::from_decimal(3.5)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_and_conversions() {
        assert_eq!(OddFormat::from_fraction(5, 2).to_string(), "5/2");
        assert_eq!(OddFormat::from_decimal(3.5).to_string(), "3.50");
        assert_eq!(OddFormat::from_decimal(3.5).to_fraction(), OddFormat::from_fraction(5, 2));
        assert_eq!(OddFormat::from_fraction(1, 2).to_decimal(), OddFormat::from_decimal(1.5));
    }

    #[test]
    fn test_combined_decimal_odd() {
        let odds = [OddFormat::from_decimal(2.0), OddFormat::from_fraction(3, 4)];
        assert!((combined_decimal_odd(&odds) - 3.5).abs() < 1e-12);
        assert_eq!(combined_decimal_odd(&[] as &[OddFormat]), 1.0);
    }
}
