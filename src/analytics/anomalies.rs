use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::{mean, median, sample_std};
use crate::error::{AnalyticsError, Result};
use crate::types::{PriceFrame, PriceSeries};

pub const DEFAULT_SPIKE_WINDOW: usize = 30;
pub const DEFAULT_SPIKE_Z: f64 = 3.0;
pub const DEFAULT_RECENT_WINDOW: usize = 20;
pub const DEFAULT_PAST_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpike {
    pub timestamp: DateTime<Utc>,
    pub volume: f64,
    pub zscore: f64,
}

/// Rows whose volume z-score against the trailing `window` rows (the row
/// itself included) exceeds `z_threshold`.
pub fn detect_volume_spikes(
    frame: &PriceFrame,
    volume_col: &str,
    window: usize,
    z_threshold: f64,
) -> Result<Vec<VolumeSpike>> {
    if window < 2 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "volume spike window must be at least 2, got {}",
            window
        )));
    }
    let volumes = frame.column(volume_col)?;
    let mut spikes = Vec::new();

    for i in (window - 1)..volumes.len() {
        let slice: Option<Vec<f64>> = volumes[i + 1 - window..=i].iter().copied().collect();
        let Some(slice) = slice else { continue };
        let std = sample_std(&slice);
        if std == 0.0 {
            continue;
        }
        let volume = slice[slice.len() - 1];
        let zscore = (volume - mean(&slice)) / std;
        if zscore > z_threshold {
            spikes.push(VolumeSpike {
                timestamp: frame.index()[i],
                volume,
                zscore,
            });
        }
    }

    debug!("Found {} volume spikes in '{}'", spikes.len(), volume_col);
    Ok(spikes)
}

/// Median-centred Levene (Brown-Forsythe) test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityShift {
    pub statistic: f64,
    pub p_value: f64,
}

impl VolatilityShift {
    pub fn none() -> Self {
        Self {
            statistic: 0.0,
            p_value: 1.0,
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Test whether the variance of the last `recent_window` returns differs
/// from that of the first `past_window` returns.
pub fn detect_volatility_shift(prices: &PriceSeries, recent_window: usize, past_window: usize) -> VolatilityShift {
    let returns: Vec<f64> = prices.returns().into_iter().map(|(_, r)| r).collect();
    if recent_window < 2 || past_window < 2 || returns.len() < recent_window + past_window {
        return VolatilityShift::none();
    }

    let recent = &returns[returns.len() - recent_window..];
    let past = &returns[..past_window];
    levene_median(&[recent, past])
}

fn levene_median(groups: &[&[f64]]) -> VolatilityShift {
    let k = groups.len() as f64;
    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let center = median(g);
            g.iter().map(|v| (v - center).abs()).collect()
        })
        .collect();

    let n_total: usize = deviations.iter().map(Vec::len).sum();
    let n_total = n_total as f64;
    let group_means: Vec<f64> = deviations.iter().map(|d| mean(d)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / n_total;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.iter().map(|z| (z - m).powi(2)).sum::<f64>())
        .sum();

    if within == 0.0 {
        return VolatilityShift::none();
    }

    let d1 = k - 1.0;
    let d2 = n_total - k;
    let statistic = (d2 / d1) * between / within;
    let p_value = match FisherSnedecor::new(d1, d2) {
        Ok(dist) => (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0),
        Err(e) => {
            warn!("F distribution unavailable ({}), reporting no shift", e);
            return VolatilityShift::none();
        }
    };

    VolatilityShift { statistic, p_value }
}

/// Pearson correlation of returns between named assets.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[[i, j]])
    }
}

/// Correlation of returns over the timestamps where every series has a
/// price.
pub fn correlation_matrix(series: &BTreeMap<String, PriceSeries>) -> CorrelationMatrix {
    let names: Vec<String> = series.keys().cloned().collect();
    let priced: Vec<BTreeMap<DateTime<Utc>, f64>> = series
        .values()
        .map(|s| s.valid_points().into_iter().collect())
        .collect();

    let common: BTreeSet<DateTime<Utc>> = match priced.split_first() {
        Some((first, rest)) => first
            .keys()
            .filter(|ts| rest.iter().all(|m| m.contains_key(*ts)))
            .copied()
            .collect(),
        None => BTreeSet::new(),
    };

    let returns: Vec<Vec<f64>> = priced
        .iter()
        .map(|m| {
            let prices: Vec<f64> = common.iter().map(|ts| m[ts]).collect();
            prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
        })
        .collect();

    let n = names.len();
    let mut values = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            values[[i, j]] = if i == j { 1.0 } else { pearson(&returns[i], &returns[j]) };
        }
    }

    debug!("Correlation matrix over {} assets, {} common rows", n, common.len());
    CorrelationMatrix { names, values }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || a.len() != b.len() {
        return 0.0;
    }
    let (ma, mb) = (mean(a), mean(b));
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    if va == 0.0 || vb == 0.0 {
        return 0.0;
    }
    cov / (va.sqrt() * vb.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn stamps(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(stamps(prices.len()), prices.iter().map(|p| Some(*p)).collect()).unwrap()
    }

    #[test]
    fn test_volume_spike_detected() {
        let mut volumes: Vec<Option<f64>> = (0..10).map(|i| Some(100.0 + (i % 2) as f64)).collect();
        volumes.push(Some(1000.0));
        let frame = PriceFrame::new(stamps(11)).with_column("Volume", volumes).unwrap();
        let spikes = detect_volume_spikes(&frame, "Volume", 10, 2.5).unwrap();
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].timestamp, stamps(11)[10]);
        assert_eq!(spikes[0].volume, 1000.0);
    }

    #[test]
    fn test_volume_spike_missing_column() {
        let frame = PriceFrame::new(stamps(1)).with_column("Close", vec![Some(1.0)]).unwrap();
        assert!(matches!(
            detect_volume_spikes(&frame, "Volume", 30, 3.0),
            Err(AnalyticsError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_volatility_shift_insufficient_data() {
        let shift = detect_volatility_shift(&series(&[100.0, 101.0, 102.0]), 20, 100);
        assert_eq!(shift, VolatilityShift::none());
    }

    #[test]
    fn test_volatility_shift_detects_regime_change() {
        let mut prices = vec![100.0];
        for i in 0..40 {
            let step = 1.0 + 0.001 * ((i % 5) as f64 - 2.0);
            prices.push(prices[prices.len() - 1] * step);
        }
        for i in 0..20 {
            let step = 1.0 + 0.05 * ((i % 5) as f64 - 2.0);
            prices.push(prices[prices.len() - 1] * step);
        }
        let shift = detect_volatility_shift(&series(&prices), 20, 40);
        assert!(shift.statistic > 0.0);
        assert!(shift.is_significant(0.05));
    }

    #[test]
    fn test_correlation_matrix() {
        let mut input = BTreeMap::new();
        input.insert("A".to_string(), series(&[100.0, 110.0, 99.0, 105.0]));
        input.insert("B".to_string(), series(&[50.0, 55.0, 49.5, 52.5]));
        input.insert("C".to_string(), series(&[10.0, 9.0, 9.9, 9.4]));
        let matrix = correlation_matrix(&input);
        assert_eq!(matrix.values.shape(), &[3, 3]);
        assert!((matrix.get("A", "B").unwrap() - 1.0).abs() < 1e-9);
        assert!(matrix.get("A", "C").unwrap() < 0.0);
        assert_eq!(matrix.get("C", "C"), Some(1.0));
        assert!(matrix.get("A", "Z").is_none());
    }
}
