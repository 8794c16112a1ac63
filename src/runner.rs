use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::data::{load_csv, write_csv};
use crate::error::{AnalyticsError, Result};
use crate::indicators::{IndicatorProvider, NoIndicators};
use crate::report::BacktestReport;
use crate::types::PriceFrame;

/// Report produced by one run, the frame it ran on (with any indicator
/// columns added) and the files it was written to.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: BacktestReport,
    pub text: String,
    pub frame: PriceFrame,
    pub saved: Vec<PathBuf>,
}

impl RunOutput {
    /// Columns present in the run frame but not in `source`.
    pub fn added_columns(&self, source: &PriceFrame) -> Vec<String> {
        self.frame
            .column_names()
            .filter(|name| !source.has_column(name))
            .map(str::to_string)
            .collect()
    }
}

/// Loads a price table, runs the backtest report over its signal column and
/// optionally persists the report.
pub struct BacktestRunner {
    config: AppConfig,
    indicators: Box<dyn IndicatorProvider>,
}

impl BacktestRunner {
    pub fn new(config: AppConfig) -> Self {
        Self::with_indicators(config, Box::new(NoIndicators))
    }

    pub fn with_indicators(config: AppConfig, indicators: Box<dyn IndicatorProvider>) -> Self {
        Self { config, indicators }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn load_csv(&self, path: &Path) -> Result<PriceFrame> {
        if !path.exists() {
            return Err(AnalyticsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("CSV file not found: {}", path.display()),
            )));
        }
        load_csv(path, &self.config.data)
    }

    pub fn run_on_frame(&self, name: &str, frame: &PriceFrame) -> Result<RunOutput> {
        let settings = &self.config.backtest;
        if !frame.has_column(&settings.signal_col) {
            return Err(AnalyticsError::MissingColumn(settings.signal_col.clone()));
        }

        let frame = self.indicators.augment(frame, &settings.price_col, &settings.volume_col)?;
        info!(
            "Running backtest for {} ({} rows, indicators: {})",
            name,
            frame.len(),
            self.indicators.name()
        );

        let report = BacktestReport::build(
            name,
            &frame,
            &settings.signal_col,
            &settings.price_col,
            settings.initial_balance,
            settings.fee_per_trade,
            settings.periods_per_year,
        )?;
        let text = report.to_text();

        Ok(RunOutput {
            report,
            text,
            frame,
            saved: Vec::new(),
        })
    }

    pub fn run_on_csv(&self, name: &str, path: &Path) -> Result<RunOutput> {
        let source = self.load_csv(path)?;
        let mut output = self.run_on_frame(name, &source)?;

        if self.config.report.save_report {
            let with_indicators = !output.added_columns(&source).is_empty();
            output.saved = self.save(name, &output, with_indicators)?;
        }

        Ok(output)
    }

    fn save(&self, name: &str, output: &RunOutput, with_indicators: bool) -> Result<Vec<PathBuf>> {
        let dir = &self.config.report.reports_dir;
        fs::create_dir_all(dir)?;

        let stem = sanitize_name(name);
        let mut saved = Vec::new();

        let txt_path = dir.join(format!("backtest_{}.txt", stem));
        fs::write(&txt_path, &output.text)?;
        saved.push(txt_path);

        if self.config.report.html {
            let html_path = dir.join(format!("backtest_{}.html", stem));
            fs::write(&html_path, output.report.to_html()?)?;
            saved.push(html_path);
        }

        if with_indicators {
            let csv_path = dir.join(format!("backtest_{}_indicators.csv", stem));
            write_csv(&csv_path, &output.frame)?;
            saved.push(csv_path);
        }

        for path in &saved {
            info!("Backtest report saved to: {}", path.display());
        }
        Ok(saved)
    }
}

/// Keep report file names to a portable character set.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned != name {
        warn!("Report name '{}' written as '{}'", name, cleaned);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSettings;
    use crate::indicators::{BasicIndicators, MockIndicatorProvider};
    use std::io::Write;

    const CSV: &str = "Date,Close,Volume,signal\n\
        2024-01-01,100,10,0\n\
        2024-01-02,110,12,1\n\
        2024-01-03,121,11,1\n";

    fn config_in(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.backtest.initial_balance = 1000.0;
        config.report.reports_dir = dir.join("reports");
        config
    }

    fn csv_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("data.csv");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_run_on_csv_saves_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), CSV);
        let mut config = config_in(dir.path());
        config.report.html = true;

        let output = BacktestRunner::new(config).run_on_csv("US30 daily", &path).unwrap();
        assert_eq!(output.saved.len(), 2);
        assert!(output.saved[0].ends_with("backtest_US30_daily.txt"));
        assert_eq!(fs::read_to_string(&output.saved[0]).unwrap(), output.text);
        assert!(output.text.contains("- Final balance: 1100.00"));
    }

    #[test]
    fn test_run_without_saving() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), CSV);
        let mut config = config_in(dir.path());
        config.report.save_report = false;

        let output = BacktestRunner::new(config).run_on_csv("X", &path).unwrap();
        assert!(output.saved.is_empty());
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn test_missing_csv() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BacktestRunner::new(config_in(dir.path()));
        assert!(matches!(
            runner.run_on_csv("X", &dir.path().join("absent.csv")),
            Err(AnalyticsError::Io(_))
        ));
    }

    #[test]
    fn test_missing_signal_column_skips_indicators() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), "Date,Close\n2024-01-01,1\n2024-01-02,2\n");
        let mut mock = MockIndicatorProvider::new();
        mock.expect_augment().never();

        let runner = BacktestRunner::with_indicators(config_in(dir.path()), Box::new(mock));
        let frame = runner.load_csv(&path).unwrap();
        assert!(matches!(runner.run_on_frame("X", &frame), Err(AnalyticsError::MissingColumn(_))));
    }

    #[test]
    fn test_indicator_provider_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), CSV);
        let mut mock = MockIndicatorProvider::new();
        mock.expect_name().return_const("mock");
        mock.expect_augment()
            .times(1)
            .returning(|frame, price_col, _| {
                assert_eq!(price_col, "Close");
                Ok(frame.clone())
            });

        let runner = BacktestRunner::with_indicators(config_in(dir.path()), Box::new(mock));
        let frame = runner.load_csv(&path).unwrap();
        let output = runner.run_on_frame("X", &frame).unwrap();
        assert_eq!(output.report.strategy.equity_curve.len(), 3);
        assert!(output.added_columns(&frame).is_empty());
    }

    #[test]
    fn test_indicator_columns_reach_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = String::from("Date,Close,Volume,signal\n");
        for i in 0..30 {
            let close = 100.0 + (i % 7) as f64 - (i % 3) as f64;
            content.push_str(&format!("2024-01-{:02},{},{},{}\n", i + 1, close, 10 + i, i % 2));
        }
        let path = csv_file(dir.path(), &content);

        let runner = BacktestRunner::with_indicators(config_in(dir.path()), Box::new(BasicIndicators));
        let output = runner.run_on_csv("US30", &path).unwrap();
        assert!(output.frame.has_column("RSI_14"));
        assert!(output.frame.column("RSI_14").unwrap()[20].is_some());

        let csv_path = output
            .saved
            .iter()
            .find(|p| p.ends_with("backtest_US30_indicators.csv"))
            .unwrap();
        let saved = load_csv(csv_path, &DataSettings::default()).unwrap();
        assert_eq!(saved.len(), 30);
        assert!(saved.has_column("RSI_14"));
        assert!(saved.has_column("EMA_20"));

        let plain = BacktestRunner::new(config_in(dir.path())).run_on_csv("US30", &path).unwrap();
        assert_eq!(plain.report, output.report);
        assert!(!plain.frame.has_column("RSI_14"));
        assert_eq!(plain.saved.len(), 1);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("EUR/USD 1h"), "EUR_USD_1h");
        assert_eq!(sanitize_name("US30"), "US30");
    }
}
