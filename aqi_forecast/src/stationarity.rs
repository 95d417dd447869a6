//! Augmented Dickey-Fuller unit-root test
//!
//! Regression with a constant:
//!
//! ```text
//! dy_t = alpha + rho * y_{t-1} + sum_{i=1..k} gamma_i * dy_{t-i} + e_t
//! ```
//!
//! The lag order `k` is chosen by AIC on a common sample, then the regression
//! is refit on every usable observation. The statistic is `rho / se(rho)`.
//! p-values follow MacKinnon (1994), critical values MacKinnon (2010).

use crate::data::AqiSeries;
use crate::error::{AnalysisError, Result};
use aqi_math::differencing::{difference, Differencing};
use aqi_math::regression::{ols, OlsFit};
use aqi_math::MathError;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::fmt;
use tracing::{debug, info};

/// p-values above this level fail to reject the unit root
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Shortest series the test accepts
pub const MIN_OBSERVATIONS: usize = 10;

// MacKinnon (1994) p-value surface, constant only, one variable
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.86;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical value response surface, constant only
const CRIT_1PCT: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5PCT: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10PCT: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Outcome of the test at [`SIGNIFICANCE_LEVEL`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Stationary,
    NonStationary,
}

impl Verdict {
    /// `NonStationary` exactly when `p_value > 0.05`
    pub fn from_p_value(p_value: f64) -> Self {
        if p_value > SIGNIFICANCE_LEVEL {
            Verdict::NonStationary
        } else {
            Verdict::Stationary
        }
    }

    pub fn is_stationary(&self) -> bool {
        *self == Verdict::Stationary
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Stationary => write!(f, "Stationary"),
            Verdict::NonStationary => write!(f, "Non-stationary"),
        }
    }
}

/// Test statistic thresholds at common significance levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

impl CriticalValues {
    /// Finite-sample critical values for a regression with `nobs` rows
    pub fn for_sample_size(nobs: usize) -> Self {
        let t = nobs as f64;
        let surface = |b: &[f64; 4]| b[0] + b[1] / t + b[2] / t.powi(2) + b[3] / t.powi(3);
        Self {
            one_percent: surface(&CRIT_1PCT),
            five_percent: surface(&CRIT_5PCT),
            ten_percent: surface(&CRIT_10PCT),
        }
    }
}

/// Result of an augmented Dickey-Fuller test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityResult {
    /// ADF test statistic
    pub statistic: f64,
    /// Approximate p-value
    pub p_value: f64,
    /// Number of lagged differences in the final regression
    pub used_lag: usize,
    /// Observations in the final regression
    pub n_obs: usize,
    pub critical_values: CriticalValues,
    pub verdict: Verdict,
}

impl fmt::Display for StationarityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ADF statistic: {:.4}", self.statistic)?;
        writeln!(f, "p-value:       {:.4}", self.p_value)?;
        writeln!(f, "Lags used:     {}", self.used_lag)?;
        writeln!(f, "Observations:  {}", self.n_obs)?;
        writeln!(
            f,
            "Critical values: 1%: {:.3}, 5%: {:.3}, 10%: {:.3}",
            self.critical_values.one_percent,
            self.critical_values.five_percent,
            self.critical_values.ten_percent
        )?;
        write!(f, "Verdict:       {}", self.verdict)
    }
}

/// Tester settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationarityConfig {
    /// Upper bound for the lag search; `None` uses `12 * (n / 100)^(1/4)`
    pub max_lag: Option<usize>,
}

/// Runs the augmented Dickey-Fuller test
#[derive(Debug, Clone, Default)]
pub struct StationarityTester {
    config: StationarityConfig,
}

impl StationarityTester {
    pub fn new(config: StationarityConfig) -> Self {
        Self { config }
    }

    /// Test the AQI values of a series
    pub fn test(&self, series: &AqiSeries) -> Result<StationarityResult> {
        self.test_series(&series.values())
    }

    /// Test the `d`-th differences of a series
    pub fn test_differenced(&self, series: &AqiSeries, d: usize) -> Result<StationarityResult> {
        self.test_series(&Differencing::regular(d).apply(&series.values()))
    }

    /// Test an arbitrary sequence of values
    pub fn test_series(&self, values: &[f64]) -> Result<StationarityResult> {
        let n = values.len();
        if n < MIN_OBSERVATIONS {
            return Err(AnalysisError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: n,
            });
        }

        let max_lag = self.max_lag(n);
        let diffs = difference(values, 1);

        // Every candidate uses the same rows so their AICs are comparable
        let mut best_lag = 0;
        let mut best_aic = f64::INFINITY;
        for lag in 0..=max_lag {
            // Singular lag orders drop out of the search
            let aic = match adf_regression(values, &diffs, lag, max_lag) {
                Ok(fit) => fit.aic(),
                Err(_) => continue,
            };
            if aic < best_aic {
                best_aic = aic;
                best_lag = lag;
            }
        }

        let fit = adf_regression(values, &diffs, best_lag, best_lag)?;
        if fit.rss <= 0.0 {
            return Err(MathError::CalculationError(
                "ADF regression fits the series exactly".to_string(),
            )
            .into());
        }
        let statistic = fit.t_statistic(1).ok_or_else(|| {
            MathError::CalculationError("ADF statistic has zero standard error".to_string())
        })?;

        let p_value = mackinnon_p_value(statistic);
        let verdict = Verdict::from_p_value(p_value);
        debug!(max_lag, best_lag, best_aic, "ADF lag selection");
        info!(statistic, p_value, %verdict, "ADF test");

        Ok(StationarityResult {
            statistic,
            p_value,
            used_lag: best_lag,
            n_obs: fit.nobs,
            critical_values: CriticalValues::for_sample_size(fit.nobs),
            verdict,
        })
    }

    fn max_lag(&self, n: usize) -> usize {
        let cap = n / 2 - 2;
        let lag = self
            .config
            .max_lag
            .unwrap_or_else(|| (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize);
        lag.min(cap)
    }
}

/// Fit the ADF regression with `lag` lagged differences on rows `start..`.
fn adf_regression(levels: &[f64], diffs: &[f64], lag: usize, start: usize) -> Result<OlsFit> {
    let (rows, response): (Vec<Vec<f64>>, Vec<f64>) = (start.max(lag)..diffs.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(1.0);
            row.push(levels[t]);
            row.extend((1..=lag).map(|i| diffs[t - i]));
            (row, diffs[t])
        })
        .unzip();

    Ok(ols(&rows, &response)?)
}

/// Approximate p-value of an ADF statistic (constant, no trend).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let z = if statistic <= TAU_STAR {
        polynomial(&TAU_SMALL_P, statistic)
    } else {
        polynomial(&TAU_LARGE_P, statistic)
    };
    standard_normal_cdf(z)
}

fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, Verdict::Stationary)]
    #[case(0.01, Verdict::Stationary)]
    #[case(0.05, Verdict::Stationary)]
    #[case(0.0500001, Verdict::NonStationary)]
    #[case(0.9, Verdict::NonStationary)]
    fn test_verdict_threshold(#[case] p: f64, #[case] expected: Verdict) {
        assert_eq!(Verdict::from_p_value(p), expected);
    }

    #[test]
    fn test_p_value_bounds() {
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-20.0), 0.0);
        assert_relative_eq!(mackinnon_p_value(-2.86), 0.05, epsilon = 0.002);
    }

    #[test]
    fn test_p_value_is_monotone() {
        let stats: Vec<f64> = (0..120).map(|i| -18.0 + 0.17 * i as f64).collect();
        let p: Vec<f64> = stats.iter().map(|s| mackinnon_p_value(*s)).collect();
        assert!(p.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_critical_values_ordering() {
        let cv = CriticalValues::for_sample_size(500);
        assert!(cv.one_percent < cv.five_percent);
        assert!(cv.five_percent < cv.ten_percent);
        assert_relative_eq!(cv.five_percent, -2.867, epsilon = 0.002);
    }

    #[test]
    fn test_too_short() {
        let tester = StationarityTester::default();
        let result = tester.test_series(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(AnalysisError::InsufficientData { needed: 10, got: 3 })
        ));
    }

    #[test]
    fn test_constant_series_is_an_error() {
        let tester = StationarityTester::default();
        let result = tester.test_series(&[5.0; 50]);
        assert!(matches!(result, Err(AnalysisError::Math(_))));
    }

    #[test]
    fn test_max_lag_rule() {
        let tester = StationarityTester::default();
        assert_eq!(tester.max_lag(100), 12);
        assert_eq!(tester.max_lag(730), 19);
        assert_eq!(tester.max_lag(10), 3);

        let capped = StationarityTester::new(StationarityConfig { max_lag: Some(2) });
        assert_eq!(capped.max_lag(730), 2);
    }
}
