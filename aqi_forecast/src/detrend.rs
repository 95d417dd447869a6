//! Rolling-mean detrending

use crate::data::AqiSeries;
use crate::error::{AnalysisError, Result};
use aqi_math::moving_averages::trailing_mean;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Detrender settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetrendConfig {
    /// Trailing window in observations
    pub window: usize,
}

impl Default for DetrendConfig {
    fn default() -> Self {
        Self { window: 12 }
    }
}

/// Trend estimate and what remains after removing it
#[derive(Debug, Clone, PartialEq)]
pub struct DetrendResult {
    pub dates: Vec<NaiveDate>,
    /// Mean of the `window` values ending at each point
    pub moving_average: Vec<Option<f64>>,
    /// observed - moving_average
    pub detrended: Vec<Option<f64>>,
    pub window: usize,
}

impl DetrendResult {
    /// Mean detrended value per calendar month (1-12), months without any
    /// defined value omitted
    pub fn monthly_profile(&self) -> Vec<(u32, f64)> {
        let mut sums = [0.0; 12];
        let mut counts = [0usize; 12];
        for (date, value) in self.dates.iter().zip(&self.detrended) {
            if let Some(v) = value {
                let month = date.month0() as usize;
                sums[month] += v;
                counts[month] += 1;
            }
        }

        (0..12)
            .filter(|&m| counts[m] > 0)
            .map(|m| (m as u32 + 1, sums[m] / counts[m] as f64))
            .collect()
    }
}

/// Removes a trailing moving-average trend
#[derive(Debug, Clone)]
pub struct Detrender {
    config: DetrendConfig,
}

impl Detrender {
    pub fn new(config: DetrendConfig) -> Result<Self> {
        if config.window == 0 {
            return Err(AnalysisError::InvalidParameter(
                "detrending window must be at least 1".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn detrend(&self, series: &AqiSeries) -> Result<DetrendResult> {
        let window = self.config.window;
        let observed = series.values();
        if observed.len() < window {
            return Err(AnalysisError::InsufficientData {
                needed: window,
                got: observed.len(),
            });
        }

        let moving_average = trailing_mean(&observed, window)?;
        let detrended = observed
            .iter()
            .zip(&moving_average)
            .map(|(y, m)| m.map(|m| y - m))
            .collect();

        info!(window, "detrended series");

        Ok(DetrendResult {
            dates: series.dates(),
            moving_average,
            detrended,
            window,
        })
    }
}
