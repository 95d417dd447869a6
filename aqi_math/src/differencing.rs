//! Differencing operators
//!
//! Regular differencing `(1 - L)^d` and seasonal differencing `(1 - L^m)^D`,
//! plus the combined operator expressed as a lag polynomial so forecasts can
//! be integrated back to the original scale.

use crate::polynomial::LagPolynomial;

pub use anofox_forecast::models::arima::{difference, seasonal_difference};

/// Combined differencing operator `(1 - L)^d (1 - L^m)^D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Differencing {
    /// Regular differencing order
    pub d: usize,
    /// Seasonal differencing order
    pub seasonal_d: usize,
    /// Seasonal lag
    pub period: usize,
}

impl Differencing {
    /// Regular differencing only
    pub fn regular(d: usize) -> Self {
        Self {
            d,
            seasonal_d: 0,
            period: 0,
        }
    }

    /// Regular and seasonal differencing
    pub fn seasonal(d: usize, seasonal_d: usize, period: usize) -> Self {
        Self {
            d,
            seasonal_d,
            period,
        }
    }

    /// Number of leading observations consumed by the operator
    pub fn lost_observations(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    /// Apply the operator: seasonal differences first, then regular ones.
    ///
    /// The result is always `lost_observations()` shorter than the input, and
    /// empty when the input is not longer than that.
    pub fn apply(&self, series: &[f64]) -> Vec<f64> {
        if series.len() <= self.lost_observations() {
            return Vec::new();
        }
        let seasonal = seasonal_difference(series, self.seasonal_d, self.period);
        difference(&seasonal, self.d)
    }

    /// The operator as a lag polynomial `1 - c_1 L - c_2 L^2 - ...`
    pub fn polynomial(&self) -> LagPolynomial {
        let mut poly = LagPolynomial::one();
        let first = LagPolynomial::from_coefficients(vec![1.0, -1.0]);
        for _ in 0..self.d {
            poly = poly.multiply(&first);
        }

        if self.period > 0 {
            let mut seasonal = vec![0.0; self.period + 1];
            seasonal[0] = 1.0;
            seasonal[self.period] = -1.0;
            let seasonal = LagPolynomial::from_coefficients(seasonal);
            for _ in 0..self.seasonal_d {
                poly = poly.multiply(&seasonal);
            }
        }

        poly
    }

    /// Undo the operator for the value at the end of `history`.
    ///
    /// Given the differenced value `w_t` and the original values before `t`,
    /// returns `y_t = w_t + c_1 y_{t-1} + c_2 y_{t-2} + ...`.
    pub fn integrate_next(&self, differenced: f64, history: &[f64]) -> f64 {
        let poly = self.polynomial();
        let coefficients = poly.coefficients();
        let n = history.len();

        coefficients
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(lag, _)| *lag <= n)
            .fold(differenced, |acc, (lag, &c)| acc - c * history[n - lag])
    }
}
