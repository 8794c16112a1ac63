use super::Indicator;

#[derive(Debug, Clone)]
pub struct EMA {
    period: usize,
    multiplier: f64,
    value: Option<f64>,
    count: usize,
    sum: f64,
    seed_with_first: bool,
}

impl EMA {
    pub fn new(period: usize) -> Self {
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            multiplier,
            value: None,
            count: 0,
            sum: 0.0,
            seed_with_first: false,
        }
    }

    /// EMA seeded with the first price, defined from the first update on
    /// (the recursive `span` form without bias adjustment).
    pub fn seeded_with_first(period: usize) -> Self {
        Self {
            seed_with_first: true,
            ..Self::new(period)
        }
    }

    /// Seeded with the SMA of the first `period` prices unless built with
    /// [`EMA::seeded_with_first`].
    pub fn update(&mut self, price: f64) -> Option<f64> {
        self.count += 1;

        if self.seed_with_first {
            let next = match self.value {
                Some(prev_ema) => (price - prev_ema) * self.multiplier + prev_ema,
                None => price,
            };
            self.value = Some(next);
            return self.value;
        }

        if self.count < self.period {
            self.sum += price;
            return None;
        } else if self.count == self.period {
            self.sum += price;
            self.value = Some(self.sum / self.period as f64);
            return self.value;
        }

        if let Some(prev_ema) = self.value {
            self.value = Some((price - prev_ema) * self.multiplier + prev_ema);
        }

        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for EMA {
    fn name(&self) -> &'static str {
        "EMA"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.value = None;
        self.count = 0;
        self.sum = 0.0;
    }
}

pub fn calculate_ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    let mut ema = EMA::new(period);
    prices.iter().filter_map(|p| ema.update(*p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_seed_and_update() {
        let mut ema = EMA::new(3);
        assert_eq!(ema.update(1.0), None);
        assert_eq!(ema.update(2.0), None);
        assert_eq!(ema.update(3.0), Some(2.0));
        // multiplier 0.5
        assert_eq!(ema.update(4.0), Some(3.0));
        ema.reset();
        assert!(!ema.is_ready());
    }

    #[test]
    fn test_ema_seeded_with_first_price() {
        let mut ema = EMA::seeded_with_first(3);
        assert_eq!(ema.update(1.0), Some(1.0));
        assert_eq!(ema.update(3.0), Some(2.0));
        assert_eq!(ema.update(4.0), Some(3.0));
        ema.reset();
        assert!(!ema.is_ready());
        assert_eq!(ema.update(5.0), Some(5.0));
    }

    #[test]
    fn test_ema_series_length() {
        let series = calculate_ema_series(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(series.len(), 3);
    }
}
