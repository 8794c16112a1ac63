use std::path::Path;
use tracing::info;

use super::AppConfig;
use crate::error::{AnalyticsError, Result};

pub const ENV_PREFIX: &str = "SIGNAL_BACKTEST";

/// Build an `AppConfig` from defaults, an optional TOML file and
/// `SIGNAL_BACKTEST__SECTION__KEY` environment variables, in that order.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let app: AppConfig = settings.try_deserialize()?;
    app.validate()
        .map_err(|errors| AnalyticsError::InvalidParameter(errors.join(", ")))?;

    info!(
        "Configuration loaded: balance={:.2}, fee={:.2}, price_col={}, signal_col={}",
        app.backtest.initial_balance, app.backtest.fee_per_trade, app.backtest.price_col, app.backtest.signal_col
    );
    Ok(app)
}
