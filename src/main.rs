use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use signal_backtester::analytics::{analyze_time_patterns, correlation_matrix, detect_volatility_shift};
use signal_backtester::analytics::{DEFAULT_PAST_WINDOW, DEFAULT_RECENT_WINDOW};
use signal_backtester::config::{load_config, AppConfig};
use signal_backtester::data::load_csv;
use signal_backtester::indicators::{BasicIndicators, IndicatorProvider, NoIndicators};
use signal_backtester::report::{summarize_asset, summarize_time_patterns};
use signal_backtester::runner::BacktestRunner;

#[derive(Parser)]
#[command(name = "signal-backtester")]
#[command(version = "0.1.0")]
#[command(about = "Backtest position signals and analyze return seasonality of price series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print structured results as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the signal column of a CSV and print the report
    Backtest {
        /// Input CSV with a date column, a price column and a signal column
        #[arg(long)]
        csv: PathBuf,
        /// Asset name used in the report
        #[arg(short, long)]
        name: String,
        /// Signal column (overrides config)
        #[arg(long)]
        signal_col: Option<String>,
        /// Price column (overrides config)
        #[arg(long)]
        price_col: Option<String>,
        /// Initial balance (overrides config)
        #[arg(long)]
        initial_balance: Option<f64>,
        /// Flat fee charged on every signal change (overrides config)
        #[arg(long)]
        fee: Option<f64>,
        /// Do not write report files
        #[arg(long)]
        no_save: bool,
        /// Also write an HTML report
        #[arg(long)]
        html: bool,
        /// Add SMA/EMA/RSI/MACD/Bollinger columns before running
        #[arg(long)]
        indicators: bool,
    },
    /// Print a one-asset summary (returns, volatility, volume spikes)
    Summary {
        #[arg(long)]
        csv: PathBuf,
        #[arg(short, long)]
        name: String,
    },
    /// Print day/hour/month seasonality tables
    Patterns {
        #[arg(long)]
        csv: PathBuf,
        #[arg(short, long)]
        name: String,
    },
    /// Correlation of returns between assets, given as NAME=PATH pairs
    Correlate {
        #[arg(required = true, num_args = 2..)]
        assets: Vec<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    if cli.log_json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(log_filter(cli.verbose))
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(log_filter(cli.verbose))
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    info!("Signal backtester v0.1.0");

    match cli.command {
        Commands::Backtest {
            csv,
            name,
            signal_col,
            price_col,
            initial_balance,
            fee,
            no_save,
            html,
            indicators,
        } => {
            if let Some(col) = signal_col {
                config.backtest.signal_col = col;
            }
            if let Some(col) = price_col {
                config.backtest.price_col = col;
            }
            if let Some(balance) = initial_balance {
                config.backtest.initial_balance = balance;
            }
            if let Some(fee) = fee {
                config.backtest.fee_per_trade = fee;
            }
            config.report.save_report &= !no_save;
            config.report.html |= html;
            config.validate().map_err(|errors| anyhow!(errors.join(", ")))?;

            run_backtest(config, &csv, &name, indicators, cli.json)?;
        }
        Commands::Summary { csv, name } => {
            let frame = load_csv(&csv, &config.data)?;
            let text = summarize_asset(
                &name,
                &frame,
                &config.backtest.price_col,
                &config.backtest.volume_col,
                &config.report,
            )?;
            println!("{}", text);

            let prices = frame.price_series(&config.backtest.price_col)?;
            let shift = detect_volatility_shift(&prices, DEFAULT_RECENT_WINDOW, DEFAULT_PAST_WINDOW);
            if shift.is_significant(0.05) {
                println!(
                    "- Volatility regime shift: W={:.2}, p={:.4}",
                    shift.statistic, shift.p_value
                );
            }
        }
        Commands::Patterns { csv, name } => {
            let frame = load_csv(&csv, &config.data)?;
            let prices = frame.price_series(&config.backtest.price_col)?;
            let analysis = analyze_time_patterns(&prices);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                println!("{}", summarize_time_patterns(&name, &analysis));
            }
        }
        Commands::Correlate { assets } => {
            run_correlation(&config, &assets)?;
        }
    }

    Ok(())
}

fn log_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn run_backtest(config: AppConfig, csv: &Path, name: &str, indicators: bool, json: bool) -> Result<()> {
    let provider: Box<dyn IndicatorProvider> = if indicators {
        Box::new(BasicIndicators)
    } else {
        Box::new(NoIndicators)
    };
    let runner = BacktestRunner::with_indicators(config, provider);
    let output = runner.run_on_csv(name, csv)?;

    if json && indicators {
        let value = serde_json::json!({ "report": &output.report, "frame": &output.frame });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if json {
        println!("{}", serde_json::to_string_pretty(&output.report)?);
    } else {
        println!("{}", output.text);
    }

    if output.saved.is_empty() {
        info!("Report not saved");
    }
    Ok(())
}

fn run_correlation(config: &AppConfig, assets: &[String]) -> Result<()> {
    let mut series = BTreeMap::new();
    for spec in assets {
        let (name, path) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=PATH, got '{}'", spec))?;
        let frame = load_csv(path, &config.data)?;
        let prices = frame.price_series(&config.backtest.price_col)?;
        if prices.valid_count() < 3 {
            warn!("{} has only {} prices", name, prices.valid_count());
        }
        series.insert(name.to_string(), prices);
    }

    let matrix = correlation_matrix(&series);
    print!("{:>10}", "");
    for name in &matrix.names {
        print!("{:>10}", name);
    }
    println!();
    for (i, name) in matrix.names.iter().enumerate() {
        print!("{:>10}", name);
        for j in 0..matrix.names.len() {
            print!("{:>10.3}", matrix.values[[i, j]]);
        }
        println!();
    }
    Ok(())
}
