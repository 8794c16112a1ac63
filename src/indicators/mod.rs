pub mod ema;
pub mod rsi;
pub mod macd;
pub mod bollinger;

pub use ema::*;
pub use rsi::*;
pub use macd::*;
pub use bollinger::*;

use tracing::debug;

use crate::error::Result;
use crate::types::PriceFrame;

pub trait Indicator {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    fn reset(&mut self);
}

pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sum: f64 = values.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Population standard deviation of the last `period` values.
pub fn stddev(values: &[f64], period: usize) -> Option<f64> {
    let mean = sma(values, period)?;
    let variance = values
        .iter()
        .rev()
        .take(period)
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / period as f64;
    Some(variance.sqrt())
}

/// Adds derived indicator columns to a frame.
#[cfg_attr(test, mockall::automock)]
pub trait IndicatorProvider {
    fn name(&self) -> &'static str;
    fn augment(&self, frame: &PriceFrame, price_col: &str, volume_col: &str) -> Result<PriceFrame>;
}

/// Provider that leaves the frame untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndicators;

impl IndicatorProvider for NoIndicators {
    fn name(&self) -> &'static str {
        "none"
    }

    fn augment(&self, frame: &PriceFrame, _price_col: &str, _volume_col: &str) -> Result<PriceFrame> {
        Ok(frame.clone())
    }
}

/// SMA 50/200, EMA 20, RSI 14, MACD 12/26/9 with histogram, Bollinger 20/2 and a 20-period
/// volume average.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicIndicators;

/// Feed the present cells of `column` through `step`, keeping missing rows
/// missing in the output.
fn stream<F>(column: &[Option<f64>], mut step: F) -> Vec<Option<f64>>
where
    F: FnMut(f64) -> Option<f64>,
{
    column.iter().map(|cell| cell.and_then(&mut step)).collect()
}

fn rolling_mean(column: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut window: Vec<f64> = Vec::with_capacity(period);
    stream(column, |v| {
        window.push(v);
        if window.len() > period {
            window.remove(0);
        }
        sma(&window, period)
    })
}

impl IndicatorProvider for BasicIndicators {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn augment(&self, frame: &PriceFrame, price_col: &str, volume_col: &str) -> Result<PriceFrame> {
        let close = frame.column(price_col)?.to_vec();
        let mut out = frame.clone();

        out.insert_column("SMA_50", rolling_mean(&close, 50))?;
        out.insert_column("SMA_200", rolling_mean(&close, 200))?;

        let mut ema = EMA::seeded_with_first(20);
        out.insert_column("EMA_20", stream(&close, |p| ema.update(p)))?;

        let mut rsi = RSI::new(14);
        out.insert_column("RSI_14", stream(&close, |p| rsi.update(p)))?;

        let mut macd = MACD::default_params();
        let mut macd_line = Vec::with_capacity(close.len());
        let mut macd_signal = Vec::with_capacity(close.len());
        let mut macd_hist = Vec::with_capacity(close.len());
        for cell in &close {
            match cell {
                Some(p) => {
                    macd.update(*p);
                    macd_line.push(macd.macd_line());
                    macd_signal.push(macd.signal_line());
                    macd_hist.push(macd.histogram());
                }
                None => {
                    macd_line.push(None);
                    macd_signal.push(None);
                    macd_hist.push(None);
                }
            }
        }
        out.insert_column("MACD", macd_line)?;
        out.insert_column("MACD_signal", macd_signal)?;
        out.insert_column("MACD_hist", macd_hist)?;

        let mut bb = BollingerBands::default_params();
        let bands: Vec<Option<BollingerOutput>> = close.iter().map(|c| c.and_then(|p| bb.update(p))).collect();
        out.insert_column("BB_up", bands.iter().map(|b| b.map(|b| b.upper)).collect())?;
        out.insert_column("BB_mid", bands.iter().map(|b| b.map(|b| b.middle)).collect())?;
        out.insert_column("BB_low", bands.iter().map(|b| b.map(|b| b.lower)).collect())?;

        if let Ok(volume) = frame.column(volume_col) {
            out.insert_column("Vol_MA_20", rolling_mean(volume, 20))?;
        }

        debug!("Added indicator columns to {} rows", out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn frame(n: usize, with_volume: bool) -> PriceFrame {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let index = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let mut frame = PriceFrame::new(index)
            .with_column("Close", (0..n).map(|i| Some(100.0 + i as f64)).collect())
            .unwrap();
        if with_volume {
            frame.insert_column("Volume", vec![Some(10.0); n]).unwrap();
        }
        frame
    }

    #[test]
    fn test_sma_and_stddev() {
        assert_eq!(sma(&[1.0, 2.0, 3.0], 2), Some(2.5));
        assert_eq!(sma(&[1.0], 2), None);
        assert_eq!(stddev(&[2.0, 4.0], 2), Some(1.0));
    }

    #[test]
    fn test_no_indicators_is_identity() {
        let f = frame(5, false);
        assert_eq!(NoIndicators.augment(&f, "Close", "Volume").unwrap(), f);
    }

    #[test]
    fn test_basic_indicators_columns() {
        let out = BasicIndicators.augment(&frame(60, true), "Close", "Volume").unwrap();
        for col in ["SMA_50", "SMA_200", "EMA_20", "RSI_14", "MACD", "MACD_signal", "MACD_hist", "BB_up", "BB_mid", "BB_low", "Vol_MA_20"] {
            assert!(out.has_column(col), "missing {}", col);
        }
        let sma50 = out.column("SMA_50").unwrap();
        assert!(sma50[48].is_none());
        assert_eq!(sma50[49], Some(124.5));
        assert!(out.column("SMA_200").unwrap().iter().all(Option::is_none));
        assert_eq!(out.column("RSI_14").unwrap()[14], Some(100.0));
        assert_eq!(out.column("Vol_MA_20").unwrap()[19], Some(10.0));

        let ema20 = out.column("EMA_20").unwrap();
        assert_eq!(ema20[0], Some(100.0));
        let expected = 100.0 + (101.0 - 100.0) * 2.0 / 21.0;
        assert!((ema20[1].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_basic_indicators_without_volume() {
        let out = BasicIndicators.augment(&frame(5, false), "Close", "Volume").unwrap();
        assert!(!out.has_column("Vol_MA_20"));
        assert!(BasicIndicators.augment(&frame(5, false), "Adj Close", "Volume").is_err());
    }
}
