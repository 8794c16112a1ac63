use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analytics::{DEFAULT_PERIODS_PER_YEAR, DEFAULT_ROLLING_WINDOW, DEFAULT_SPIKE_WINDOW, DEFAULT_SPIKE_Z};

/// Explicit configuration handed to the runner and the CLI. Nothing in the
/// analytics core reads the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backtest: BacktestSettings,
    pub data: DataSettings,
    pub report: ReportSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Backtest validation
        if !(self.backtest.initial_balance > 0.0) {
            errors.push("initial_balance must be > 0".to_string());
        }
        if !(self.backtest.fee_per_trade >= 0.0) {
            errors.push("fee_per_trade must be >= 0".to_string());
        }
        if self.backtest.periods_per_year == 0 {
            errors.push("periods_per_year must be > 0".to_string());
        }
        if self.backtest.price_col.is_empty() || self.backtest.signal_col.is_empty() {
            errors.push("price_col and signal_col must be set".to_string());
        }

        // Data validation
        if self.data.date_columns.is_empty() {
            errors.push("at least one date column name is required".to_string());
        }

        // Report validation
        if self.report.rolling_window < 2 {
            errors.push("rolling_window must be >= 2".to_string());
        }
        if self.report.spike_window < 2 {
            errors.push("spike_window must be >= 2".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_balance: f64,
    pub fee_per_trade: f64,
    pub price_col: String,
    pub signal_col: String,
    pub volume_col: String,
    pub periods_per_year: u32,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_balance: 100_000.0,
            fee_per_trade: 0.0,
            price_col: "Close".to_string(),
            signal_col: "signal".to_string(),
            volume_col: "Volume".to_string(),
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Candidate names for the timestamp column, tried in order.
    pub date_columns: Vec<String>,
    pub delimiter: char,
    /// Optional chrono format for naive timestamps, e.g. "%d/%m/%Y %H:%M".
    pub date_format: Option<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            date_columns: vec![
                "Date".to_string(),
                "datetime".to_string(),
                "Datetime".to_string(),
                "date".to_string(),
                "timestamp".to_string(),
            ],
            delimiter: ',',
            date_format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub reports_dir: PathBuf,
    pub save_report: bool,
    pub html: bool,
    pub rolling_window: usize,
    pub spike_window: usize,
    pub spike_z_threshold: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            save_report: true,
            html: false,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            spike_window: DEFAULT_SPIKE_WINDOW,
            spike_z_threshold: DEFAULT_SPIKE_Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_collected() {
        let mut config = AppConfig::default();
        config.backtest.initial_balance = 0.0;
        config.backtest.fee_per_trade = -5.0;
        config.report.rolling_window = 1;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
