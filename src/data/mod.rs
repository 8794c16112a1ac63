use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, Writer};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::DataSettings;
use crate::error::{AnalyticsError, Result};
use crate::types::PriceFrame;

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

/// Parse a timestamp cell, trying the configured format first. Naive values
/// are taken as UTC.
pub fn parse_timestamp(value: &str, format: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Some(fmt) = format {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return midnight(d);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in &DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    for fmt in &DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return midnight(d);
        }
    }

    value.parse::<i64>().ok().and_then(|ts| DateTime::from_timestamp(ts, 0))
}

/// Numeric cell; blanks and NaN markers are missing.
fn parse_cell(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Load a CSV with a timestamp column and numeric columns into a frame,
/// sorted by timestamp.
pub fn load_csv(path: impl AsRef<Path>, settings: &DataSettings) -> Result<PriceFrame> {
    let path = path.as_ref();
    info!("Loading data from: {}", path.display());

    let mut delimiter = [0u8; 4];
    let delimiter = settings.delimiter.encode_utf8(&mut delimiter).as_bytes()[0];
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let date_idx = settings
        .date_columns
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
        .ok_or_else(|| {
            AnalyticsError::MissingColumn(settings.date_columns.first().cloned().unwrap_or_default())
        })?;

    let mut rows: Vec<(DateTime<Utc>, Vec<Option<f64>>)> = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let raw_ts = record.get(date_idx).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts, settings.date_format.as_deref()).ok_or_else(|| {
            AnalyticsError::InvalidTimestamp {
                row,
                value: raw_ts.to_string(),
            }
        })?;
        let cells = (0..headers.len())
            .map(|i| record.get(i).and_then(parse_cell))
            .collect();
        rows.push((timestamp, cells));
    }

    if rows.windows(2).any(|w| w[1].0 < w[0].0) {
        warn!("Rows in {} are not in time order, sorting", path.display());
        rows.sort_by_key(|(ts, _)| *ts);
    }

    let index: Vec<DateTime<Utc>> = rows.iter().map(|(ts, _)| *ts).collect();
    let mut frame = PriceFrame::new(index);
    for (i, name) in headers.iter().enumerate() {
        if i == date_idx {
            continue;
        }
        let column: Vec<Option<f64>> = rows.iter().map(|(_, cells)| cells[i]).collect();
        frame.insert_column(name, column)?;
    }

    debug!("Loaded {} rows with columns {:?}", frame.len(), frame.column_names().collect::<Vec<_>>());
    Ok(frame)
}

/// Write a frame as CSV: a `Date` column in RFC 3339 followed by the named
/// columns. Missing cells are left blank.
pub fn write_csv(path: impl AsRef<Path>, frame: &PriceFrame) -> Result<()> {
    let path = path.as_ref();
    let names: Vec<&str> = frame.column_names().collect();
    let columns = names
        .iter()
        .map(|name| frame.column(name))
        .collect::<Result<Vec<_>>>()?;

    let mut writer = Writer::from_path(path)?;
    let mut header = vec!["Date"];
    header.extend(names.iter().copied());
    writer.write_record(&header)?;

    for (row, timestamp) in frame.index().iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(timestamp.to_rfc3339());
        record.extend(
            columns
                .iter()
                .map(|column| column[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;

    debug!("Wrote {} rows x {} columns to {}", frame.len(), names.len(), path.display());
    Ok(())
}
