use super::{sma, stddev, Indicator};

#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
    prices: Vec<f64>,
    output: Option<BollingerOutput>,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Self {
        Self {
            period,
            std_dev_multiplier,
            prices: Vec::with_capacity(period),
            output: None,
        }
    }

    pub fn default_params() -> Self {
        Self::new(20, 2.0)
    }

    pub fn update(&mut self, price: f64) -> Option<BollingerOutput> {
        self.prices.push(price);
        if self.prices.len() > self.period {
            self.prices.remove(0);
        }

        let middle = sma(&self.prices, self.period)?;
        let deviation = stddev(&self.prices, self.period)? * self.std_dev_multiplier;

        self.output = Some(BollingerOutput {
            upper: middle + deviation,
            middle,
            lower: middle - deviation,
        });
        self.output
    }

    pub fn output(&self) -> Option<BollingerOutput> {
        self.output
    }

    /// Width of the bands as a percentage of the middle band.
    pub fn bandwidth(&self) -> Option<f64> {
        self.output
            .filter(|o| o.middle != 0.0)
            .map(|o| (o.upper - o.lower) / o.middle * 100.0)
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &'static str {
        "BollingerBands"
    }

    fn is_ready(&self) -> bool {
        self.output.is_some()
    }

    fn reset(&mut self) {
        self.prices.clear();
        self.output = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_on_flat_prices() {
        let mut bb = BollingerBands::new(3, 2.0);
        assert!(bb.update(10.0).is_none());
        assert!(bb.update(10.0).is_none());
        let out = bb.update(10.0).unwrap();
        assert_eq!(out.upper, 10.0);
        assert_eq!(out.lower, 10.0);
        assert_eq!(bb.bandwidth(), Some(0.0));
    }

    #[test]
    fn test_bands_are_symmetric() {
        let mut bb = BollingerBands::new(2, 2.0);
        bb.update(9.0);
        let out = bb.update(11.0).unwrap();
        assert_eq!(out.middle, 10.0);
        assert!((out.upper - 12.0).abs() < 1e-12);
        assert!((out.lower - 8.0).abs() < 1e-12);
    }
}
