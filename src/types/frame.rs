use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{PriceSeries, SignalSeries};
use crate::error::{AnalyticsError, Result};

/// Timestamp-indexed table of named numeric columns, the in-memory shape of
/// an OHLCV+signal CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceFrame {
    index: Vec<DateTime<Utc>>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl PriceFrame {
    pub fn new(index: Vec<DateTime<Utc>>) -> Self {
        Self {
            index,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn insert_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.index.len() {
            return Err(AnalyticsError::SeriesMisaligned(format!(
                "column '{}' has {} rows, index has {}",
                name,
                values.len(),
                self.index.len()
            )));
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| AnalyticsError::MissingColumn(name.to_string()))
    }

    pub fn price_series(&self, price_col: &str) -> Result<PriceSeries> {
        PriceSeries::new(self.index.clone(), self.column(price_col)?.to_vec())
    }

    pub fn signal_series(&self, signal_col: &str) -> Result<SignalSeries> {
        SignalSeries::from_raw(self.index.clone(), self.column(signal_col)?)
    }
}
