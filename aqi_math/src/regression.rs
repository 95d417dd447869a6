//! Least-squares regression
//!
//! - Simple linear trend fit against the observation index
//! - Multiple regression with coefficient standard errors, used by the
//!   unit-root test and for ARMA starting values

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};

/// Singular values of `X'X` below this share of the largest are treated as zero
const RANK_TOLERANCE: f64 = 1e-12;

/// Straight line fitted against the observation index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Change per step
    pub slope: f64,
    /// Value at index zero
    pub intercept: f64,
    /// Coefficient of determination
    pub r_squared: f64,
}

/// Fit `y = intercept + slope * x` by least squares.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(MathError::InsufficientData(
            "Not enough data for a linear fit. Need at least 2 points.".to_string(),
        ));
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        numerator += (xi - x_mean) * (yi - y_mean);
        denominator += (xi - x_mean) * (xi - x_mean);
    }

    if denominator.abs() < 1e-10 {
        return Err(MathError::CalculationError(
            "Cannot calculate slope: x values are too similar".to_string(),
        ));
    }

    let slope = numerator / denominator;
    let intercept = y_mean - slope * x_mean;

    let mut ss_total = 0.0;
    let mut ss_residual = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        ss_total += (yi - y_mean).powi(2);
        ss_residual += (yi - (intercept + slope * xi)).powi(2);
    }
    let r_squared = if ss_total.abs() < 1e-12 {
        1.0
    } else {
        1.0 - ss_residual / ss_total
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Fit a line to the defined points of a sequence with gaps, using the
/// position in the sequence as `x`.
pub fn linear_fit_defined(values: &[Option<f64>]) -> Result<LinearFit> {
    let (x, y): (Vec<f64>, Vec<f64>) = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
        .unzip();
    linear_fit(&x, &y)
}

/// Ordinary least squares estimates
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// One coefficient per design column
    pub coefficients: Vec<f64>,
    /// Standard error of each coefficient
    pub standard_errors: Vec<f64>,
    /// Residual sum of squares
    pub rss: f64,
    /// Number of observations
    pub nobs: usize,
}

impl OlsFit {
    /// Akaike information criterion in the `n ln(RSS/n) + 2k` form
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        n * (self.rss / n).ln() + 2.0 * self.coefficients.len() as f64
    }

    /// t-statistic of coefficient `index`
    pub fn t_statistic(&self, index: usize) -> Option<f64> {
        let coefficient = self.coefficients.get(index)?;
        let se = self.standard_errors.get(index)?;
        if *se > 0.0 && se.is_finite() {
            Some(coefficient / se)
        } else {
            None
        }
    }
}

/// Solve `y = X b + e` where `rows[i]` is the i-th row of `X`.
pub fn ols(rows: &[Vec<f64>], y: &[f64]) -> Result<OlsFit> {
    let nobs = rows.len();
    if nobs != y.len() {
        return Err(MathError::InvalidInput(format!(
            "design has {} rows but response has {} values",
            nobs,
            y.len()
        )));
    }
    let k = rows.first().map(Vec::len).unwrap_or(0);
    if k == 0 {
        return Err(MathError::InvalidInput(
            "design matrix has no columns".to_string(),
        ));
    }
    if nobs <= k {
        return Err(MathError::InsufficientData(format!(
            "regression with {} columns needs more than {} rows, got {}",
            k, k, nobs
        )));
    }

    if rows.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "design rows have different lengths".to_string(),
        ));
    }

    let x = DMatrix::from_fn(nobs, k, |i, j| rows[i][j]);
    let response = DVector::from_column_slice(y);
    let xtx = x.transpose() * &x;

    let svd = xtx.svd(true, true);
    let tolerance = svd.singular_values.max() * RANK_TOLERANCE;
    if svd.rank(tolerance) < k {
        return Err(MathError::CalculationError(
            "design matrix is singular".to_string(),
        ));
    }
    let inverse = svd
        .pseudo_inverse(tolerance)
        .map_err(|err| MathError::CalculationError(err.to_string()))?;

    let beta = &inverse * (x.transpose() * &response);
    let rss = (&response - &x * &beta).norm_squared();

    let sigma2 = rss / (nobs - k) as f64;
    let standard_errors = (0..k)
        .map(|i| (sigma2 * inverse[(i, i)]).max(0.0).sqrt())
        .collect();

    Ok(OlsFit {
        coefficients: beta.iter().copied().collect(),
        standard_errors,
        rss,
        nobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_fit_exact_line() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 0.5 * v).collect();
        let fit = linear_fit(&x, &y).unwrap();

        assert_relative_eq!(fit.slope, 0.5, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 3.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_fit_defined_skips_gaps() {
        let values = vec![None, Some(2.0), Some(4.0), Some(6.0), None];
        let fit = linear_fit_defined(&values).unwrap();
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_fit_needs_two_points() {
        assert!(matches!(
            linear_fit(&[1.0], &[1.0]),
            Err(MathError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_ols_recovers_coefficients() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let x = i as f64;
                vec![1.0, x, (x * 0.7).sin()]
            })
            .collect();
        let y: Vec<f64> = rows
            .iter()
            .map(|r| 2.0 + 0.3 * r[1] - 1.5 * r[2])
            .collect();

        let fit = ols(&rows, &y).unwrap();
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[1], 0.3, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[2], -1.5, epsilon = 1e-8);
        assert!(fit.rss < 1e-12);
    }

    #[test]
    fn test_ols_standard_errors_are_positive_with_noise() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..30)
            .map(|i| 1.0 + 2.0 * i as f64 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let fit = ols(&rows, &y).unwrap();

        assert!(fit.standard_errors.iter().all(|se| *se > 0.0));
        assert!(fit.t_statistic(1).unwrap() > 10.0);
        assert!(fit.aic().is_finite());
    }

    #[test]
    fn test_ols_singular_design() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64, 2.0 * i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert!(matches!(
            ols(&rows, &y),
            Err(MathError::CalculationError(_))
        ));
    }
}
