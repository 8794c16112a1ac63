pub mod returns;
pub mod backtest;
pub mod patterns;
pub mod anomalies;

pub use returns::*;
pub use backtest::*;
pub use patterns::*;
pub use anomalies::*;

use rust_decimal::Decimal;
use std::cmp::Ordering;

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1). Zero for fewer than two values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Round a computed figure to 2 dp for presentation. Figures beyond the
/// `Decimal` range saturate to `Decimal::MAX` / `Decimal::MIN`; NaN and
/// negative zero are reported as plain zero.
pub(crate) fn presented(value: f64) -> Decimal {
    if value.is_nan() {
        return Decimal::ZERO;
    }
    let rounded = match Decimal::from_f64_retain(value) {
        Some(decimal) => decimal.round_dp(2),
        None if value > 0.0 => Decimal::MAX,
        None => Decimal::MIN,
    };
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sample_std() {
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert!((sample_std(&[1.0, 2.0, 3.0, 4.0]) - 1.2909944487).abs() < 1e-9);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_presented_rounding() {
        assert_eq!(presented(10.004), dec!(10.00));
        assert_eq!(presented(-25.0), dec!(-25));
        assert_eq!(presented(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn test_presented_saturates_out_of_range() {
        assert_eq!(presented(1e40), Decimal::MAX);
        assert_eq!(presented(f64::INFINITY), Decimal::MAX);
        assert_eq!(presented(-1e40), Decimal::MIN);
        assert_eq!(presented(f64::NEG_INFINITY), Decimal::MIN);
    }
}
