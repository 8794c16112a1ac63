use super::{ema::EMA, Indicator};

#[derive(Debug, Clone)]
pub struct MACD {
    fast_ema: EMA,
    slow_ema: EMA,
    signal_ema: EMA,
    macd_line: Option<f64>,
    signal_line: Option<f64>,
    histogram: Option<f64>,
}

impl MACD {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_ema: EMA::new(fast_period),
            slow_ema: EMA::new(slow_period),
            signal_ema: EMA::new(signal_period),
            macd_line: None,
            signal_line: None,
            histogram: None,
        }
    }

    pub fn default_params() -> Self {
        Self::new(12, 26, 9)
    }

    /// Returns the full output once the signal line is formed. The MACD line
    /// alone is available earlier through `macd_line()`.
    pub fn update(&mut self, price: f64) -> Option<MACDOutput> {
        let fast = self.fast_ema.update(price);
        let slow = self.slow_ema.update(price);

        if let (Some(f), Some(s)) = (fast, slow) {
            let macd_line = f - s;
            self.macd_line = Some(macd_line);

            if let Some(signal) = self.signal_ema.update(macd_line) {
                let histogram = macd_line - signal;
                self.signal_line = Some(signal);
                self.histogram = Some(histogram);

                return Some(MACDOutput {
                    macd_line,
                    signal_line: signal,
                    histogram,
                });
            }
        }

        None
    }

    pub fn macd_line(&self) -> Option<f64> {
        self.macd_line
    }

    pub fn signal_line(&self) -> Option<f64> {
        self.signal_line
    }

    pub fn histogram(&self) -> Option<f64> {
        self.histogram
    }
}

impl Indicator for MACD {
    fn name(&self) -> &'static str {
        "MACD"
    }

    fn is_ready(&self) -> bool {
        self.histogram.is_some()
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.signal_ema.reset();
        self.macd_line = None;
        self.signal_line = None;
        self.histogram = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MACDOutput {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
}
