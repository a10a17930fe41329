// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decimal <-> double bridge.
//!
//! The native side has no decimal type, so decimals cross as `f64`. The
//! conversion back is total: values beyond the decimal range clamp to
//! [`Decimal::MIN`] / [`Decimal::MAX`] and NaN maps to [`Decimal::MIN`].

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Magnitudes below this round to zero (decimal scale tops out at 28).
const SMALLEST_NONZERO: f64 = 1e-28;

pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

pub fn decimal_from_f64(value: f64) -> Decimal {
    if value.is_nan() {
        return Decimal::MIN;
    }
    if value.abs() < SMALLEST_NONZERO {
        return Decimal::ZERO;
    }
    if value <= decimal_to_f64(Decimal::MIN) {
        return Decimal::MIN;
    }
    if value >= decimal_to_f64(Decimal::MAX) {
        return Decimal::MAX;
    }
    Decimal::from_f64(value).unwrap_or(if value < 0.0 {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_values_survive() {
        assert_eq!(decimal_from_f64(0.0), Decimal::ZERO);
        assert_eq!(decimal_from_f64(-1.5), Decimal::new(-15, 1));
        assert_eq!(decimal_from_f64(1_000_000.25), Decimal::new(100_000_025, 2));
    }

    #[test]
    fn test_below_minimum_clamps_to_min() {
        assert_eq!(decimal_from_f64(-1e30), Decimal::MIN);
        assert_eq!(decimal_from_f64(f64::NEG_INFINITY), Decimal::MIN);
        assert_eq!(decimal_from_f64(f64::MIN), Decimal::MIN);
    }

    #[test]
    fn test_above_maximum_clamps_to_max() {
        assert_eq!(decimal_from_f64(1e30), Decimal::MAX);
        assert_eq!(decimal_from_f64(f64::INFINITY), Decimal::MAX);
        assert_eq!(decimal_from_f64(f64::MAX), Decimal::MAX);
    }

    #[test]
    fn test_nan_maps_to_min() {
        assert_eq!(decimal_from_f64(f64::NAN), Decimal::MIN);
    }

    #[test]
    fn test_extremes_are_lossy_but_total() {
        assert_eq!(decimal_from_f64(decimal_to_f64(Decimal::MAX)), Decimal::MAX);
        assert_eq!(decimal_from_f64(decimal_to_f64(Decimal::MIN)), Decimal::MIN);
    }

    #[test]
    fn test_tiny_magnitudes_round_to_zero() {
        assert_eq!(decimal_from_f64(1e-300), Decimal::ZERO);
        assert_eq!(decimal_from_f64(-f64::MIN_POSITIVE), Decimal::ZERO);
    }
}
