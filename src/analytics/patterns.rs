use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use super::{mean, sample_std};
use crate::types::PriceSeries;

pub const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    DayOfWeek,
    HourOfDay,
    MonthOfYear,
}

impl Granularity {
    /// Calendar bucket of a timestamp: 0=Monday..6=Sunday, 0..23, 1..12.
    pub fn bucket(&self, ts: &DateTime<Utc>) -> u32 {
        match self {
            Granularity::DayOfWeek => ts.weekday().num_days_from_monday(),
            Granularity::HourOfDay => ts.hour(),
            Granularity::MonthOfYear => ts.month(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::DayOfWeek => "day_of_week",
            Granularity::HourOfDay => "hour",
            Granularity::MonthOfYear => "month",
        }
    }

    pub fn bucket_label(&self, bucket: u32) -> String {
        match self {
            Granularity::DayOfWeek => DAY_NAMES
                .get(bucket as usize)
                .map(|d| d.to_string())
                .unwrap_or_else(|| bucket.to_string()),
            Granularity::HourOfDay => format!("{}:00", bucket),
            Granularity::MonthOfYear => bucket.to_string(),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Return statistics of one calendar bucket. `_pct` fields are the
/// fractional fields scaled by 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePatternRow {
    pub bucket: u32,
    pub mean_return: f64,
    pub std_return: f64,
    pub count: usize,
    pub win_rate: f64,
    pub mean_return_pct: f64,
    pub std_return_pct: f64,
    pub win_rate_pct: f64,
}

impl TimePatternRow {
    fn from_returns(bucket: u32, returns: &[f64]) -> Self {
        let count = returns.len();
        let mean_return = mean(returns);
        let std_return = sample_std(returns);
        let wins = returns.iter().filter(|r| **r > 0.0).count();
        let win_rate = if count > 0 { wins as f64 / count as f64 } else { 0.0 };

        Self {
            bucket,
            mean_return,
            std_return,
            count,
            win_rate,
            mean_return_pct: mean_return * 100.0,
            std_return_pct: std_return * 100.0,
            win_rate_pct: win_rate * 100.0,
        }
    }
}

/// Per-bucket statistics, sorted by `mean_return` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePatternTable {
    pub granularity: Granularity,
    pub rows: Vec<TimePatternRow>,
}

impl TimePatternTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn best(&self) -> Option<&TimePatternRow> {
        self.rows.first()
    }

    pub fn get(&self, bucket: u32) -> Option<&TimePatternRow> {
        self.rows.iter().find(|r| r.bucket == bucket)
    }

    /// Rows in canonical bucket order.
    pub fn by_bucket(&self) -> Vec<&TimePatternRow> {
        let mut rows: Vec<_> = self.rows.iter().collect();
        rows.sort_by_key(|r| r.bucket);
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePatternAnalysis {
    pub day_of_week: TimePatternTable,
    /// `None` when the series carries no intraday resolution.
    pub hour_of_day: Option<TimePatternTable>,
    pub month_of_year: TimePatternTable,
}

fn bucket_returns(prices: &PriceSeries, granularity: Granularity) -> TimePatternTable {
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for (ts, ret) in prices.returns() {
        groups.entry(granularity.bucket(&ts)).or_default().push(ret);
    }

    let mut rows: Vec<TimePatternRow> = groups
        .iter()
        .map(|(bucket, returns)| TimePatternRow::from_returns(*bucket, returns))
        .collect();
    rows.sort_by(|a, b| b.mean_return.partial_cmp(&a.mean_return).unwrap_or(Ordering::Equal));

    debug!("{} table: {} buckets", granularity, rows.len());
    TimePatternTable { granularity, rows }
}

pub fn day_of_week_performance(prices: &PriceSeries) -> TimePatternTable {
    bucket_returns(prices, Granularity::DayOfWeek)
}

/// Hour-of-day table, or `None` when every timestamp shares one hour.
pub fn hour_of_day_performance(prices: &PriceSeries) -> Option<TimePatternTable> {
    let hours: BTreeSet<u32> = prices.timestamps().iter().map(|ts| ts.hour()).collect();
    if hours.len() <= 1 {
        debug!("No intraday resolution ({} distinct hours)", hours.len());
        return None;
    }
    Some(bucket_returns(prices, Granularity::HourOfDay))
}

pub fn month_of_year_performance(prices: &PriceSeries) -> TimePatternTable {
    bucket_returns(prices, Granularity::MonthOfYear)
}

pub fn analyze_time_patterns(prices: &PriceSeries) -> TimePatternAnalysis {
    TimePatternAnalysis {
        day_of_week: day_of_week_performance(prices),
        hour_of_day: hour_of_day_performance(prices),
        month_of_year: month_of_year_performance(prices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn daily(prices: &[f64]) -> PriceSeries {
        // 2024-01-01 is a Monday
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| (start + Duration::days(i as i64), *p))
            .collect();
        PriceSeries::from_points(&points).unwrap()
    }

    #[test]
    fn test_day_of_week_buckets() {
        // Tue +10%, Wed -10%, Thu +0%
        let table = day_of_week_performance(&daily(&[100.0, 110.0, 99.0, 99.0]));
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.best().unwrap().bucket, 1);
        assert_eq!(table.rows.last().unwrap().bucket, 2);
        let tue = table.get(1).unwrap();
        assert_eq!(tue.count, 1);
        assert_eq!(tue.win_rate, 1.0);
        assert_eq!(tue.std_return, 0.0);
        assert!((tue.mean_return_pct - 10.0).abs() < 1e-9);
        assert_eq!(table.get(3).unwrap().win_rate, 0.0);
    }

    #[test]
    fn test_canonical_order_available() {
        let table = day_of_week_performance(&daily(&[100.0, 110.0, 99.0, 99.0]));
        let buckets: Vec<u32> = table.by_bucket().iter().map(|r| r.bucket).collect();
        assert_eq!(buckets, vec![1, 2, 3]);
    }

    #[test]
    fn test_hour_table_absent_for_daily_data() {
        let series = daily(&[100.0, 101.0, 102.0]);
        assert!(hour_of_day_performance(&series).is_none());
    }

    #[test]
    fn test_hour_table_for_intraday_data() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let points: Vec<_> = [100.0, 101.0, 100.0, 102.0]
            .iter()
            .enumerate()
            .map(|(i, p)| (start + Duration::hours(i as i64), *p))
            .collect();
        let table = hour_of_day_performance(&PriceSeries::from_points(&points).unwrap()).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.best().unwrap().bucket, 12);
    }

    #[test]
    fn test_hour_check_covers_rows_without_price() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut timestamps: Vec<_> = (0..3).map(|i| start + Duration::days(i)).collect();
        timestamps.insert(2, start + Duration::days(1) + Duration::hours(12));
        let series = PriceSeries::new(timestamps, vec![Some(100.0), Some(101.0), None, Some(102.0)]).unwrap();

        let table = hour_of_day_performance(&series).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.get(0).unwrap().count, 2);
    }

    #[test]
    fn test_empty_series_yields_empty_tables() {
        let analysis = analyze_time_patterns(&PriceSeries::empty());
        assert!(analysis.day_of_week.is_empty());
        assert!(analysis.month_of_year.is_empty());
        assert!(analysis.hour_of_day.is_none());
    }

    #[test]
    fn test_month_buckets() {
        let start = Utc.with_ymd_and_hms(2024, 1, 30, 0, 0, 0).unwrap();
        let points: Vec<_> = [100.0, 101.0, 102.0, 99.0]
            .iter()
            .enumerate()
            .map(|(i, p)| (start + Duration::days(i as i64), *p))
            .collect();
        let table = month_of_year_performance(&PriceSeries::from_points(&points).unwrap());
        assert_eq!(table.get(1).unwrap().count, 1);
        assert_eq!(table.get(2).unwrap().count, 2);
        assert_eq!(table.best().unwrap().bucket, 1);
    }
}
