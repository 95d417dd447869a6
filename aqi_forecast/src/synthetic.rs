//! Seeded synthetic AQI series for demos, tests and benchmarks

use crate::data::AqiSeries;
use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Shape of a synthetic series: `base + slope * t + pattern[t % len] + noise`
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSeries {
    pub start: NaiveDate,
    pub days: usize,
    pub base: f64,
    /// Trend per day
    pub slope: f64,
    /// Repeating seasonal offsets
    pub pattern: Vec<f64>,
    /// Standard deviation of the Gaussian noise
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for SyntheticSeries {
    /// Two years of daily data with a weekly cycle and a rising trend
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            days: 730,
            base: 40.0,
            slope: 0.5,
            pattern: vec![-6.0, -3.0, 0.0, 4.0, 7.0, 3.0, -5.0],
            noise_std: 1.0,
            seed: 42,
        }
    }
}

impl SyntheticSeries {
    /// Draw the series. The same settings always give the same values.
    pub fn generate(&self) -> Result<AqiSeries> {
        let noise = Normal::new(0.0, self.noise_std)
            .map_err(|e| AnalysisError::InvalidParameter(format!("noise: {}", e)))?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let values: Vec<u32> = (0..self.days)
            .map(|t| {
                let seasonal = if self.pattern.is_empty() {
                    0.0
                } else {
                    self.pattern[t % self.pattern.len()]
                };
                let value =
                    self.base + self.slope * t as f64 + seasonal + noise.sample(&mut rng);
                value.round().max(0.0) as u32
            })
            .collect();

        AqiSeries::from_values(self.start, &values)
    }
}
