use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{finite_or_zero, mean, presented, sample_std};
use crate::types::PriceSeries;

pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;
pub const DEFAULT_ROLLING_WINDOW: usize = 14;

/// Buy-and-hold return profile of a price series, rounded to 2 dp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReturnStats {
    pub total_return_pct: Decimal,
    pub annual_return_pct: Decimal,
    pub annual_vol_pct: Decimal,
    pub sharpe: Decimal,
}

impl ReturnStats {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Aggregate return, volatility and Sharpe over the valid prices of `prices`.
///
/// Fewer than two valid prices yields all-zero stats. A flat market has zero
/// volatility and a Sharpe of 0.
pub fn calc_return_stats(prices: &PriceSeries, periods_per_year: u32) -> ReturnStats {
    let returns: Vec<f64> = prices.returns().into_iter().map(|(_, r)| r).collect();
    if returns.is_empty() {
        debug!("No returns available ({} valid prices), reporting zero stats", prices.valid_count());
        return ReturnStats::zero();
    }

    let (first, last) = match (prices.first_valid(), prices.last_valid()) {
        (Some(first), Some((_, last))) => (first, last),
        _ => return ReturnStats::zero(),
    };

    let periods = f64::from(periods_per_year);
    let total_return = (last / first - 1.0) * 100.0;
    let avg_ret = mean(&returns);
    let vol = sample_std(&returns);

    // May exceed the Decimal range (or f64) for intraday periods; `presented`
    // saturates rather than zeroing it.
    let annual_return = (1.0 + avg_ret).powf(periods) - 1.0;
    let annual_vol = finite_or_zero(vol * periods.sqrt());
    let sharpe = if annual_vol != 0.0 {
        annual_return / annual_vol
    } else {
        0.0
    };

    debug!(
        "Return stats over {} returns: total={:.4}% annual={:.4} vol={:.4}",
        returns.len(),
        total_return,
        annual_return,
        annual_vol
    );

    ReturnStats {
        total_return_pct: presented(total_return),
        annual_return_pct: presented(annual_return * 100.0),
        annual_vol_pct: presented(annual_vol * 100.0),
        sharpe: presented(sharpe),
    }
}

/// Annualized rolling volatility (fractional) of the trailing `window`
/// returns. Entries are `None` until the window is full.
pub fn rolling_volatility(
    prices: &PriceSeries,
    window: usize,
    periods_per_year: u32,
) -> Vec<(DateTime<Utc>, Option<f64>)> {
    let returns = prices.returns();
    let scale = f64::from(periods_per_year).sqrt();
    let values: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();

    returns
        .iter()
        .enumerate()
        .map(|(i, (ts, _))| {
            let vol = if window >= 2 && i + 1 >= window {
                Some(sample_std(&values[i + 1 - window..=i]) * scale)
            } else {
                None
            };
            (*ts, vol)
        })
        .collect()
}

/// Most recent fully-formed rolling volatility, if any.
pub fn latest_rolling_volatility(prices: &PriceSeries, window: usize, periods_per_year: u32) -> Option<f64> {
    rolling_volatility(prices, window, periods_per_year)
        .into_iter()
        .rev()
        .find_map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn series(prices: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| (start + Duration::days(i as i64), *p))
            .collect();
        PriceSeries::from_points(&points).unwrap()
    }

    #[test]
    fn test_constant_prices_have_zero_stats() {
        let stats = calc_return_stats(&series(&[100.0, 100.0, 100.0, 100.0]), 252);
        assert_eq!(stats.total_return_pct, Decimal::ZERO);
        assert_eq!(stats.annual_vol_pct, Decimal::ZERO);
        assert_eq!(stats.sharpe, Decimal::ZERO);
    }

    #[test]
    fn test_single_price_degrades_to_zero() {
        assert_eq!(calc_return_stats(&series(&[100.0]), 252), ReturnStats::zero());
        assert_eq!(calc_return_stats(&PriceSeries::empty(), 252), ReturnStats::zero());
    }

    #[test]
    fn test_total_and_annual_return() {
        // Two equal 10% steps: mean 0.1, zero sample std.
        let stats = calc_return_stats(&series(&[100.0, 110.0, 121.0]), 1);
        assert_eq!(stats.total_return_pct, dec!(21.00));
        assert_eq!(stats.annual_return_pct, dec!(10.00));
        assert_eq!(stats.annual_vol_pct, Decimal::ZERO);
        assert_eq!(stats.sharpe, Decimal::ZERO);
    }

    #[test]
    fn test_volatility_uses_sample_std() {
        // Returns +10% and -10%: sample std = sqrt(0.02) ~ 0.141421
        let stats = calc_return_stats(&series(&[100.0, 110.0, 99.0]), 1);
        assert_eq!(stats.annual_vol_pct, dec!(14.14));
        assert_eq!(stats.annual_return_pct, Decimal::ZERO);
        assert_eq!(stats.total_return_pct, dec!(-1.00));
    }

    #[test]
    fn test_intraday_annualization_saturates_instead_of_zeroing() {
        // 50 hourly bars alternating +4% / +1%, annualized over 252 * 24 periods.
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut price = 100.0;
        let mut points = vec![(start, price)];
        for i in 1..50 {
            price *= if i % 2 == 1 { 1.04 } else { 1.01 };
            points.push((start + Duration::hours(i), price));
        }
        let stats = calc_return_stats(&PriceSeries::from_points(&points).unwrap(), 252 * 24);

        assert_eq!(stats.total_return_pct, dec!(238.49));
        assert_eq!(stats.annual_vol_pct, dec!(117.84));
        assert_eq!(stats.annual_return_pct, Decimal::MAX);
        assert_eq!(stats.sharpe, Decimal::MAX);
    }

    #[test]
    fn test_rolling_volatility_warmup() {
        let vols = rolling_volatility(&series(&[100.0, 101.0, 100.0, 102.0, 101.0]), 3, 252);
        assert_eq!(vols.len(), 4);
        assert!(vols[0].1.is_none());
        assert!(vols[1].1.is_none());
        assert!(vols[2].1.is_some());
        assert!(latest_rolling_volatility(&series(&[100.0, 101.0]), 14, 252).is_none());
    }
}
