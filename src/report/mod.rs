pub mod text;
pub mod html;

pub use html::html_backtest_report;
pub use text::{full_backtest_report, summarize_asset, summarize_time_patterns, BacktestReport};
