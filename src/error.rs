use thiserror::Error;

/// Errors raised by the analytics core and its file wrappers.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("insufficient data: need at least {required} valid rows, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("series misaligned: {0}")]
    SeriesMisaligned(String),

    #[error("timestamps must be strictly increasing (row {row})")]
    UnorderedTimestamps { row: usize },

    #[error("invalid signal value {value} at row {row} (expected -1, 0 or 1)")]
    InvalidSignal { row: usize, value: f64 },

    #[error("unparseable timestamp '{value}' at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("invalid price {value} at row {row}")]
    InvalidPrice { row: usize, value: f64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
