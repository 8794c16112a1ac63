use super::Indicator;

/// Wilder-smoothed relative strength index.
#[derive(Debug, Clone)]
pub struct RSI {
    period: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
    prev_price: Option<f64>,
    gains: Vec<f64>,
    losses: Vec<f64>,
    value: Option<f64>,
}

impl RSI {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            avg_gain: None,
            avg_loss: None,
            prev_price: None,
            gains: Vec::with_capacity(period),
            losses: Vec::with_capacity(period),
            value: None,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        if let Some(prev) = self.prev_price {
            let change = price - prev;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            if self.gains.len() < self.period {
                self.gains.push(gain);
                self.losses.push(loss);

                if self.gains.len() == self.period {
                    let period = self.period as f64;
                    self.avg_gain = Some(self.gains.iter().sum::<f64>() / period);
                    self.avg_loss = Some(self.losses.iter().sum::<f64>() / period);
                    self.value = self.calculate_rsi();
                }
            } else if let (Some(avg_gain), Some(avg_loss)) = (self.avg_gain, self.avg_loss) {
                let period = self.period as f64;
                self.avg_gain = Some((avg_gain * (period - 1.0) + gain) / period);
                self.avg_loss = Some((avg_loss * (period - 1.0) + loss) / period);
                self.value = self.calculate_rsi();
            }
        }

        self.prev_price = Some(price);
        self.value
    }

    fn calculate_rsi(&self) -> Option<f64> {
        match (self.avg_gain, self.avg_loss) {
            (Some(avg_gain), Some(avg_loss)) => {
                if avg_loss == 0.0 {
                    Some(100.0)
                } else {
                    let rs = avg_gain / avg_loss;
                    Some(100.0 - 100.0 / (1.0 + rs))
                }
            }
            _ => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl Indicator for RSI {
    fn name(&self) -> &'static str {
        "RSI"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.avg_gain = None;
        self.avg_loss = None;
        self.prev_price = None;
        self.gains.clear();
        self.losses.clear();
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_all_gains() {
        let mut rsi = RSI::new(3);
        for p in [1.0, 2.0, 3.0] {
            assert_eq!(rsi.update(p), None);
        }
        assert_eq!(rsi.update(4.0), Some(100.0));
    }

    #[test]
    fn test_rsi_balanced() {
        let mut rsi = RSI::new(2);
        rsi.update(10.0);
        rsi.update(11.0);
        let value = rsi.update(10.0).unwrap();
        assert!((value - 50.0).abs() < 1e-9);
    }
}
