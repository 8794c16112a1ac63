//! Signal backtesting and return statistics over time-indexed price tables.
//!
//! The analytics core (`analytics`) is a set of pure functions over
//! [`types::PriceSeries`] / [`types::SignalSeries`]. `data`, `report`,
//! `runner` and `config` are the thin wrappers that load CSVs, render and
//! persist reports.

pub mod error;
pub mod types;
pub mod analytics;
pub mod indicators;
pub mod report;
pub mod data;
pub mod config;
pub mod runner;

pub use analytics::{
    analyze_time_patterns, calc_return_stats, day_of_week_performance, hour_of_day_performance,
    month_of_year_performance, run_backtest, run_strategy_backtest, BacktestResult, ReturnStats,
    TimePatternAnalysis, TimePatternTable,
};
pub use error::{AnalyticsError, Result};
pub use report::full_backtest_report;
pub use types::{Position, PriceFrame, PriceSeries, SignalSeries};
