use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::{
    analyze_time_patterns, calc_return_stats, detect_volume_spikes, latest_rolling_volatility,
    run_strategy_backtest, BacktestResult, Granularity, ReturnStats, TimePatternAnalysis, TimePatternTable,
    DEFAULT_PERIODS_PER_YEAR,
};
use crate::config::ReportSettings;
use crate::error::Result;
use crate::types::PriceFrame;

/// Buy-and-hold baseline, strategy result and seasonality for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub name: String,
    pub base: ReturnStats,
    pub strategy: BacktestResult,
    pub patterns: TimePatternAnalysis,
}

impl BacktestReport {
    pub fn build(
        name: &str,
        frame: &PriceFrame,
        signal_col: &str,
        price_col: &str,
        initial_balance: f64,
        fee_per_trade: f64,
        periods_per_year: u32,
    ) -> Result<Self> {
        let prices = frame.price_series(price_col)?;
        let base = calc_return_stats(&prices, periods_per_year);
        let strategy = run_strategy_backtest(frame, signal_col, price_col, initial_balance, fee_per_trade)?;
        let patterns = analyze_time_patterns(&prices);

        debug!("Built backtest report for {}", name);
        Ok(Self {
            name: name.to_string(),
            base,
            strategy,
            patterns,
        })
    }

    pub fn to_text(&self) -> String {
        let mut lines = vec![format!("Backtest report for {}", self.name)];
        lines.push(String::new());
        lines.push("=== Asset base performance (buy & hold) ===".to_string());
        lines.push(format!("- Total return: {:.2}%", self.base.total_return_pct));
        lines.push(format!("- Annual return: {:.2}%", self.base.annual_return_pct));
        lines.push(format!("- Annual volatility: {:.2}%", self.base.annual_vol_pct));
        lines.push(format!("- Sharpe (approx): {:.2}", self.base.sharpe));
        lines.push(String::new());
        lines.push("=== Strategy performance (signals) ===".to_string());
        lines.push(format!("- Initial balance: {:.2}", self.strategy.initial_balance));
        lines.push(format!("- Final balance: {:.2}", self.strategy.final_balance));
        lines.push(format!("- Total return: {:.2}%", self.strategy.total_return_pct));
        lines.push(format!("- Max drawdown: {:.2}%", self.strategy.max_drawdown_pct));
        lines.push(String::new());
        lines.push("=== Time patterns ===".to_string());
        lines.push(summarize_time_patterns(&self.name, &self.patterns));
        lines.join("\n")
    }
}

/// Text report over the price and signal columns of `frame`. Errors from the
/// underlying calculations propagate unchanged.
pub fn full_backtest_report(
    name: &str,
    frame: &PriceFrame,
    signal_col: &str,
    price_col: &str,
    initial_balance: f64,
    fee_per_trade: f64,
) -> Result<String> {
    BacktestReport::build(
        name,
        frame,
        signal_col,
        price_col,
        initial_balance,
        fee_per_trade,
        DEFAULT_PERIODS_PER_YEAR,
    )
    .map(|report| report.to_text())
}

fn best_line(label: &str, table: &TimePatternTable) -> Option<String> {
    table.best().map(|best| {
        format!(
            "- Best {}: {} ({:.2}% mean, win {:.1}%)",
            label,
            table.granularity.bucket_label(best.bucket),
            best.mean_return_pct,
            best.win_rate_pct
        )
    })
}

pub fn summarize_time_patterns(name: &str, patterns: &TimePatternAnalysis) -> String {
    let mut lines = vec![format!("Time pattern analysis for {}", name)];

    lines.extend(best_line("day", &patterns.day_of_week));
    lines.extend(best_line("month", &patterns.month_of_year));

    match patterns.hour_of_day.as_ref().and_then(|t| best_line("hour", t)) {
        Some(line) => lines.push(line),
        None => lines.push("- No intraday data detected".to_string()),
    }

    lines.join("\n")
}

/// Short text profile of one asset: price, return stats, rolling volatility
/// and the most recent volume spike.
pub fn summarize_asset(
    name: &str,
    frame: &PriceFrame,
    price_col: &str,
    volume_col: &str,
    settings: &ReportSettings,
) -> Result<String> {
    let prices = frame.price_series(price_col)?;
    let stats = calc_return_stats(&prices, DEFAULT_PERIODS_PER_YEAR);
    let last_vol = latest_rolling_volatility(&prices, settings.rolling_window, DEFAULT_PERIODS_PER_YEAR)
        .map(|v| v * 100.0)
        .unwrap_or(0.0);

    let mut lines = vec![format!("{} summary:", name)];
    if let Some((_, price)) = prices.last_valid() {
        lines.push(format!("- Current price: {:.2}", price));
    }
    lines.push(format!("- Total return: {:.2}%", stats.total_return_pct));
    lines.push(format!("- Annual return: {:.2}%", stats.annual_return_pct));
    lines.push(format!("- Annual volatility: {:.2}%", stats.annual_vol_pct));
    lines.push(format!("- Sharpe (approx): {:.2}", stats.sharpe));
    lines.push(format!(
        "- Latest rolling volatility ({}p): {:.2}%",
        settings.rolling_window, last_vol
    ));

    if frame.has_column(volume_col) {
        let spikes = detect_volume_spikes(frame, volume_col, settings.spike_window, settings.spike_z_threshold)?;
        match spikes.last() {
            Some(spike) => lines.push(format!(
                "- Recent volume spike detected on: {}",
                spike.timestamp.date_naive()
            )),
            None => lines.push("- No strong volume spikes in recent window.".to_string()),
        }
    }

    Ok(lines.join("\n"))
}

pub(crate) fn granularity_title(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::DayOfWeek => "Day of week",
        Granularity::HourOfDay => "Hour of day",
        Granularity::MonthOfYear => "Month of year",
    }
}

pub(crate) fn format_decimal(value: Decimal) -> String {
    format!("{:.2}", value)
}
