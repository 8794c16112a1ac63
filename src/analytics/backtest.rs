use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::presented;
use crate::error::{AnalyticsError, Result};
use crate::types::{Position, PriceFrame, PriceSeries, SignalSeries};

/// Equity of the strategy account at the close of one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Outcome of a signal backtest. Scalars are rounded to 2 dp; the equity
/// curve keeps full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_balance: Decimal,
    pub final_balance: Decimal,
    pub total_return_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub position_changes: usize,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestResult {
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }
}

/// Rows where both the price and the signal are present.
fn aligned_rows(prices: &PriceSeries, signal: &SignalSeries) -> Result<Vec<(DateTime<Utc>, f64, Position)>> {
    if prices.timestamps() != signal.timestamps() {
        return Err(AnalyticsError::SeriesMisaligned(format!(
            "price series ({} rows) and signal series ({} rows) do not share timestamps",
            prices.len(),
            signal.len()
        )));
    }

    Ok(prices
        .timestamps()
        .iter()
        .zip(prices.prices())
        .zip(signal.values())
        .filter_map(|((ts, price), pos)| match (price, pos) {
            (Some(p), Some(s)) => Some((*ts, *p, *s)),
            _ => None,
        })
        .collect())
}

/// Run a signal backtest.
///
/// The position held over row `t` is the signal observed at row `t-1`; before
/// the first row the account is flat. Every change of signal (including the
/// first row when it is not flat) costs `fee_per_trade / initial_balance` as a
/// fractional return deduction on that row.
pub fn run_backtest(
    prices: &PriceSeries,
    signal: &SignalSeries,
    initial_balance: f64,
    fee_per_trade: f64,
) -> Result<BacktestResult> {
    if !initial_balance.is_finite() || initial_balance <= 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "initial_balance must be positive, got {}",
            initial_balance
        )));
    }
    if !fee_per_trade.is_finite() || fee_per_trade < 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "fee_per_trade must be non-negative, got {}",
            fee_per_trade
        )));
    }

    let rows = aligned_rows(prices, signal)?;
    if rows.len() < prices.len() {
        warn!("Dropped {} rows with missing price or signal", prices.len() - rows.len());
    }
    if rows.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            required: 2,
            available: rows.len(),
        });
    }

    let fee_return = fee_per_trade / initial_balance;
    let mut equity_curve = Vec::with_capacity(rows.len());
    let mut equity = initial_balance;
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0_f64;
    let mut position_changes = 0;
    let mut held = Position::Flat;
    let mut prev_price: Option<f64> = None;

    for (timestamp, price, current) in rows {
        let price_return = prev_price.map(|prev| price / prev - 1.0).unwrap_or(0.0);
        let mut strategy_return = held.as_f64() * price_return;

        if current != held {
            position_changes += 1;
            strategy_return -= fee_return;
        }

        equity *= 1.0 + strategy_return;
        peak = peak.max(equity);
        if peak > 0.0 {
            max_drawdown = max_drawdown.min(equity / peak - 1.0);
        }

        equity_curve.push(EquityPoint { timestamp, equity });
        held = current;
        prev_price = Some(price);
    }

    let total_return_pct = (equity / initial_balance - 1.0) * 100.0;
    debug!(
        "Backtest over {} rows: {} position changes, max drawdown {:.4}",
        equity_curve.len(),
        position_changes,
        max_drawdown
    );

    let result = BacktestResult {
        initial_balance: presented(initial_balance),
        final_balance: presented(equity),
        total_return_pct: presented(total_return_pct),
        max_drawdown_pct: presented(max_drawdown * 100.0),
        position_changes,
        equity_curve,
    };

    info!(
        "Backtest complete: {} position changes, {:.2}% return",
        result.position_changes, result.total_return_pct
    );

    Ok(result)
}

/// Backtest the named signal column of `frame` against its price column.
pub fn run_strategy_backtest(
    frame: &PriceFrame,
    signal_col: &str,
    price_col: &str,
    initial_balance: f64,
    fee_per_trade: f64,
) -> Result<BacktestResult> {
    let signal = frame.signal_series(signal_col)?;
    let prices = frame.price_series(price_col)?;
    run_backtest(&prices, &signal, initial_balance, fee_per_trade)
}
