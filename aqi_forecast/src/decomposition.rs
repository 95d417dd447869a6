//! Classical seasonal decomposition
//!
//! The trend is a centered moving average over one period. The seasonal
//! component is the per-phase mean of the detrended values, normalized so a
//! full period sums to zero (additive) or averages one (multiplicative).

use crate::data::AqiSeries;
use crate::error::{AnalysisError, Result};
use aqi_math::moving_averages::centered_mean;
use aqi_math::regression::linear_fit_defined;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Default period: the annual cycle of daily data
pub const DEFAULT_PERIOD: usize = 365;

/// How the components combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecompositionModel {
    /// observed = trend + seasonal + residual
    #[default]
    Additive,
    /// observed = trend * seasonal * residual
    Multiplicative,
}

impl fmt::Display for DecompositionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompositionModel::Additive => write!(f, "additive"),
            DecompositionModel::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

/// Decomposer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// Seasonal period in observations
    pub period: usize,
    pub model: DecompositionModel,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            model: DecompositionModel::Additive,
        }
    }
}

/// Components of a decomposed series, aligned with its dates
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionResult {
    pub dates: Vec<NaiveDate>,
    pub observed: Vec<f64>,
    /// `None` for the first and last `period / 2` points
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    /// `None` wherever the trend is undefined
    pub residual: Vec<Option<f64>>,
    pub period: usize,
    pub model: DecompositionModel,
}

impl DecompositionResult {
    /// Least-squares slope of the defined trend, per day
    pub fn trend_slope(&self) -> Result<f64> {
        Ok(linear_fit_defined(&self.trend)?.slope)
    }

    /// Recombine the components; `None` where the trend is undefined
    pub fn reconstruct(&self) -> Vec<Option<f64>> {
        self.trend
            .iter()
            .zip(&self.seasonal)
            .zip(&self.residual)
            .map(|((trend, seasonal), residual)| match (trend, residual) {
                (Some(t), Some(r)) => Some(match self.model {
                    DecompositionModel::Additive => t + seasonal + r,
                    DecompositionModel::Multiplicative => t * seasonal * r,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Splits a series into trend, seasonal and residual parts
#[derive(Debug, Clone)]
pub struct Decomposer {
    config: DecompositionConfig,
}

impl Decomposer {
    /// Create a new decomposer
    pub fn new(config: DecompositionConfig) -> Result<Self> {
        if config.period < 2 {
            return Err(AnalysisError::InvalidParameter(format!(
                "decomposition period must be at least 2, got {}",
                config.period
            )));
        }
        Ok(Self { config })
    }

    /// Decompose `series`. Needs at least two full periods.
    pub fn decompose(&self, series: &AqiSeries) -> Result<DecompositionResult> {
        let period = self.config.period;
        let model = self.config.model;
        let observed = series.values();
        let n = observed.len();

        if n < 2 * period {
            return Err(AnalysisError::InsufficientData {
                needed: 2 * period,
                got: n,
            });
        }
        if model == DecompositionModel::Multiplicative && observed.iter().any(|v| *v <= 0.0) {
            return Err(AnalysisError::InvalidParameter(
                "multiplicative decomposition needs strictly positive values".to_string(),
            ));
        }

        let trend = centered_mean(&observed, period)?;

        let detrended: Vec<Option<f64>> = observed
            .iter()
            .zip(&trend)
            .map(|(y, t)| {
                t.map(|t| match model {
                    DecompositionModel::Additive => y - t,
                    DecompositionModel::Multiplicative => y / t,
                })
            })
            .collect();

        let phase_means = phase_means(&detrended, period, model);
        let seasonal: Vec<f64> = (0..n).map(|i| phase_means[i % period]).collect();

        let residual: Vec<Option<f64>> = observed
            .iter()
            .zip(&trend)
            .zip(&seasonal)
            .map(|((y, t), s)| {
                t.map(|t| match model {
                    DecompositionModel::Additive => y - t - s,
                    DecompositionModel::Multiplicative => y / (t * s),
                })
            })
            .collect();

        info!(period, %model, observations = n, "decomposed series");

        Ok(DecompositionResult {
            dates: series.dates(),
            observed,
            trend,
            seasonal,
            residual,
            period,
            model,
        })
    }
}

/// Per-phase mean of the defined detrended values, centered
fn phase_means(detrended: &[Option<f64>], period: usize, model: DecompositionModel) -> Vec<f64> {
    let neutral = match model {
        DecompositionModel::Additive => 0.0,
        DecompositionModel::Multiplicative => 1.0,
    };

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, value) in detrended.iter().enumerate() {
        if let Some(v) = value {
            sums[i % period] += v;
            counts[i % period] += 1;
        }
    }

    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| if count > 0 { sum / count as f64 } else { neutral })
        .collect();

    let center = means.iter().sum::<f64>() / period as f64;
    match model {
        DecompositionModel::Additive => means.iter().map(|m| m - center).collect(),
        DecompositionModel::Multiplicative => means.iter().map(|m| m / center).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn weekly_series(days: usize) -> AqiSeries {
        let pattern = [0, 3, 6, 9, 6, 3, 0];
        let values: Vec<u32> = (0..days)
            .map(|i| 50 + (i as u32) / 2 + pattern[i % 7])
            .collect();
        AqiSeries::from_values(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), &values).unwrap()
    }

    #[test]
    fn test_seasonal_sums_to_zero() {
        let decomposer = Decomposer::new(DecompositionConfig {
            period: 7,
            model: DecompositionModel::Additive,
        })
        .unwrap();
        let result = decomposer.decompose(&weekly_series(70)).unwrap();

        let one_period: f64 = result.seasonal[..7].iter().sum();
        assert_relative_eq!(one_period, 0.0, epsilon = 1e-9);
        assert_eq!(result.trend.iter().take_while(|t| t.is_none()).count(), 3);
        assert_eq!(result.trend.iter().rev().take_while(|t| t.is_none()).count(), 3);
    }

    #[test]
    fn test_multiplicative_seasonal_averages_one() {
        let decomposer = Decomposer::new(DecompositionConfig {
            period: 7,
            model: DecompositionModel::Multiplicative,
        })
        .unwrap();
        let result = decomposer.decompose(&weekly_series(70)).unwrap();

        let mean = result.seasonal[..7].iter().sum::<f64>() / 7.0;
        assert_relative_eq!(mean, 1.0, epsilon = 1e-9);
        for (observed, rebuilt) in result.observed.iter().zip(result.reconstruct()) {
            if let Some(rebuilt) = rebuilt {
                assert_relative_eq!(*observed, rebuilt, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_trend_slope() {
        let decomposer = Decomposer::new(DecompositionConfig {
            period: 7,
            model: DecompositionModel::Additive,
        })
        .unwrap();
        let result = decomposer.decompose(&weekly_series(140)).unwrap();
        assert_relative_eq!(result.trend_slope().unwrap(), 0.5, epsilon = 0.02);
    }

    #[test]
    fn test_period_validation() {
        let config = DecompositionConfig {
            period: 1,
            model: DecompositionModel::Additive,
        };
        assert!(matches!(
            Decomposer::new(config),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_multiplicative_rejects_zero() {
        let decomposer = Decomposer::new(DecompositionConfig {
            period: 2,
            model: DecompositionModel::Multiplicative,
        })
        .unwrap();
        let series =
            AqiSeries::from_values(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), &[3, 0, 4, 5])
                .unwrap();
        assert!(matches!(
            decomposer.decompose(&series),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}
