use askama::Template;

use super::text::{format_decimal, granularity_title, BacktestReport};
use crate::analytics::{TimePatternTable, DEFAULT_PERIODS_PER_YEAR};
use crate::error::Result;
use crate::types::PriceFrame;

struct PatternRowView {
    label: String,
    mean_pct: String,
    std_pct: String,
    count: usize,
    win_rate_pct: String,
}

struct PatternTableView {
    title: &'static str,
    rows: Vec<PatternRowView>,
}

impl From<&TimePatternTable> for PatternTableView {
    fn from(table: &TimePatternTable) -> Self {
        Self {
            title: granularity_title(table.granularity),
            rows: table
                .rows
                .iter()
                .map(|row| PatternRowView {
                    label: table.granularity.bucket_label(row.bucket),
                    mean_pct: format!("{:.3}", row.mean_return_pct),
                    std_pct: format!("{:.3}", row.std_return_pct),
                    count: row.count,
                    win_rate_pct: format!("{:.1}", row.win_rate_pct),
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "backtest_report.html")]
struct BacktestReportPage<'a> {
    name: &'a str,
    base_total_return: String,
    base_annual_return: String,
    base_annual_vol: String,
    base_sharpe: String,
    initial_balance: String,
    final_balance: String,
    strategy_total_return: String,
    max_drawdown: String,
    position_changes: usize,
    tables: Vec<PatternTableView>,
    has_intraday: bool,
}

impl BacktestReport {
    pub fn to_html(&self) -> Result<String> {
        let mut tables = vec![PatternTableView::from(&self.patterns.day_of_week)];
        if let Some(hours) = &self.patterns.hour_of_day {
            tables.push(PatternTableView::from(hours));
        }
        tables.push(PatternTableView::from(&self.patterns.month_of_year));

        let page = BacktestReportPage {
            name: &self.name,
            base_total_return: format_decimal(self.base.total_return_pct),
            base_annual_return: format_decimal(self.base.annual_return_pct),
            base_annual_vol: format_decimal(self.base.annual_vol_pct),
            base_sharpe: format_decimal(self.base.sharpe),
            initial_balance: format_decimal(self.strategy.initial_balance),
            final_balance: format_decimal(self.strategy.final_balance),
            strategy_total_return: format_decimal(self.strategy.total_return_pct),
            max_drawdown: format_decimal(self.strategy.max_drawdown_pct),
            position_changes: self.strategy.position_changes,
            tables,
            has_intraday: self.patterns.hour_of_day.is_some(),
        };

        Ok(page.render()?)
    }
}

/// HTML rendering of [`super::full_backtest_report`].
pub fn html_backtest_report(
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
    )?
    .to_html()
}
