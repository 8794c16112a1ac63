use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Position;
use crate::error::{AnalyticsError, Result};

fn check_ordering(timestamps: &[DateTime<Utc>]) -> Result<()> {
    for (row, pair) in timestamps.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(AnalyticsError::UnorderedTimestamps { row: row + 1 });
        }
    }
    Ok(())
}

/// Time-indexed prices. Missing prices are kept as `None` and skipped by
/// every statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    timestamps: Vec<DateTime<Utc>>,
    prices: Vec<Option<f64>>,
}

impl PriceSeries {
    pub fn new(timestamps: Vec<DateTime<Utc>>, prices: Vec<Option<f64>>) -> Result<Self> {
        if timestamps.len() != prices.len() {
            return Err(AnalyticsError::SeriesMisaligned(format!(
                "{} timestamps vs {} prices",
                timestamps.len(),
                prices.len()
            )));
        }
        check_ordering(&timestamps)?;

        let mut cleaned = Vec::with_capacity(prices.len());
        for (row, price) in prices.into_iter().enumerate() {
            match price {
                Some(p) if !p.is_finite() => cleaned.push(None),
                Some(p) if p <= 0.0 => return Err(AnalyticsError::InvalidPrice { row, value: p }),
                other => cleaned.push(other),
            }
        }

        Ok(Self {
            timestamps,
            prices: cleaned,
        })
    }

    /// Build a series where every price is present.
    pub fn from_points(points: &[(DateTime<Utc>, f64)]) -> Result<Self> {
        let (timestamps, prices) = points.iter().map(|(ts, p)| (*ts, Some(*p))).unzip();
        Self::new(timestamps, prices)
    }

    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            prices: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn prices(&self) -> &[Option<f64>] {
        &self.prices
    }

    /// Rows with a present price, in order.
    pub fn valid_points(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.timestamps
            .iter()
            .zip(&self.prices)
            .filter_map(|(ts, p)| p.map(|p| (*ts, p)))
            .collect()
    }

    pub fn valid_count(&self) -> usize {
        self.prices.iter().filter(|p| p.is_some()).count()
    }

    pub fn first_valid(&self) -> Option<f64> {
        self.prices.iter().flatten().next().copied()
    }

    pub fn last_valid(&self) -> Option<(DateTime<Utc>, f64)> {
        self.timestamps
            .iter()
            .zip(&self.prices)
            .rev()
            .find_map(|(ts, p)| p.map(|p| (*ts, p)))
    }

    /// Simple returns between consecutive valid prices, stamped with the
    /// later timestamp.
    pub fn returns(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.valid_points()
            .windows(2)
            .map(|w| (w[1].0, w[1].1 / w[0].1 - 1.0))
            .collect()
    }
}

/// Position signal aligned to a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<Option<Position>>,
}

impl SignalSeries {
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<Option<Position>>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(AnalyticsError::SeriesMisaligned(format!(
                "{} timestamps vs {} signal values",
                timestamps.len(),
                values.len()
            )));
        }
        check_ordering(&timestamps)?;
        Ok(Self { timestamps, values })
    }

    /// Parse raw numeric cells, rejecting anything outside {-1, 0, 1}.
    pub fn from_raw(timestamps: Vec<DateTime<Utc>>, raw: &[Option<f64>]) -> Result<Self> {
        let values = raw
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Some(v) if v.is_finite() => Position::from_value(*v, row).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(timestamps, values)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[Option<Position>] {
        &self.values
    }
}
