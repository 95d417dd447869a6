//! ARIMA models estimated by conditional sum of squares
//!
//! AR and MA coefficients are searched without a box: any point whose AR part
//! is non-stationary or whose MA part is non-invertible scores as infinitely
//! bad. The likelihood is evaluated on the observations from `sample_start`
//! onwards, so models of different orders can be scored on the same sample.

use crate::error::{AnalysisError, Result};
use crate::models::{ArimaOrder, FittedModel, ForecastModel, ForecastResult, SeasonalDifferencing};
use anofox_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
use aqi_math::differencing::Differencing;
use aqi_math::polynomial::{is_invertible, is_stationary, LagPolynomial};
use aqi_math::regression::ols;
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: ArimaOrder,
    seasonal: Option<SeasonalDifferencing>,
    /// First original index scored by the likelihood, if later than the
    /// model's own conditioning point
    sample_start: Option<usize>,
    optimizer: NelderMeadConfig,
}

/// ARIMA model fitted to a series
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArima {
    order: ArimaOrder,
    seasonal: Option<SeasonalDifferencing>,
    differencing: Differencing,
    /// Mean of the differenced series
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    aicc: f64,
    bic: f64,
    /// Observations in the likelihood
    sample_size: usize,
    /// Training values on the original scale
    history: Vec<f64>,
    /// Centered differenced series
    centered: Vec<f64>,
    /// One-step residuals on the differenced scale, zero before the first
    /// conditioned point
    residuals: Vec<f64>,
}

fn default_optimizer() -> NelderMeadConfig {
    NelderMeadConfig {
        max_iter: 5000,
        tolerance: 1e-10,
        initial_step: 0.1,
        ..NelderMeadConfig::default()
    }
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(order: ArimaOrder) -> Self {
        Self {
            order,
            seasonal: None,
            sample_start: None,
            optimizer: default_optimizer(),
        }
    }

    /// Add seasonal differencing `(1 - L^m)^D`
    pub fn with_seasonal_differencing(mut self, seasonal: SeasonalDifferencing) -> Self {
        self.seasonal = if seasonal.order > 0 && seasonal.period > 1 {
            Some(seasonal)
        } else {
            None
        };
        self
    }

    /// Score the likelihood only on original observations from `start` on
    pub fn conditioned_from(mut self, start: usize) -> Self {
        self.sample_start = Some(start);
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Differencing operator applied before estimation
    pub fn differencing(&self) -> Differencing {
        match self.seasonal {
            Some(s) => Differencing::seasonal(self.order.d, s.order, s.period),
            None => Differencing::regular(self.order.d),
        }
    }

    /// First original index that enters the likelihood
    fn first_scored(&self) -> usize {
        let own = self.differencing().lost_observations() + self.order.p.max(self.order.q);
        own.max(self.sample_start.unwrap_or(0))
    }

    /// Observations needed to estimate this model
    pub fn min_observations(&self) -> usize {
        self.first_scored() + self.order.parameter_count() + 2
    }

    fn no_convergence(&self, reason: impl std::fmt::Display) -> AnalysisError {
        AnalysisError::NoConvergence(format!("{} for {}", reason, self.name()))
    }

    /// Starting AR coefficients from a least-squares autoregression
    fn initial_ar(&self, centered: &[f64], from: usize) -> Vec<f64> {
        let p = self.order.p;
        let fallback: Vec<f64> = (0..p).map(|i| 0.1 / (i + 1) as f64).collect();
        if p == 0 {
            return fallback;
        }

        let rows: Vec<Vec<f64>> = (from..centered.len())
            .map(|t| (1..=p).map(|i| centered[t - i]).collect())
            .collect();
        match ols(&rows, &centered[from..]) {
            Ok(fit) if is_stationary(&fit.coefficients) => fit.coefficients,
            _ => fallback,
        }
    }
}

impl ForecastModel for ArimaModel {
    type Fitted = FittedArima;

    fn fit(&self, values: &[f64]) -> Result<FittedArima> {
        let ArimaOrder { p, q, .. } = self.order;
        let needed = self.min_observations();
        if values.len() < needed {
            return Err(AnalysisError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let differencing = self.differencing();
        let differenced = differencing.apply(values);
        let intercept = aqi_math::mean(&differenced).ok_or(AnalysisError::InsufficientData {
            needed,
            got: values.len(),
        })?;
        let centered: Vec<f64> = differenced.iter().map(|w| w - intercept).collect();

        // Index into the differenced series of the first scored observation
        let scored_from = self.first_scored() - differencing.lost_observations();
        let sample_size = centered.len() - scored_from;
        let scale =
            centered[scored_from..].iter().map(|z| z * z).sum::<f64>() / sample_size as f64;
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(self.no_convergence("constant differenced series"));
        }

        let (ar, ma) = if p + q == 0 {
            (Vec::new(), Vec::new())
        } else {
            let mut initial = self.initial_ar(&centered, scored_from.max(p));
            initial.extend(std::iter::repeat(0.0).take(q));

            let objective = |params: &[f64]| {
                let (phi, theta) = params.split_at(p);
                if !is_stationary(phi) || !is_invertible(theta) {
                    return f64::INFINITY;
                }
                let residuals = conditional_residuals(&centered, phi, theta);
                residuals[scored_from..].iter().map(|e| e * e).sum::<f64>()
                    / (sample_size as f64 * scale)
            };

            let minimum = nelder_mead(objective, &initial, None, self.optimizer.clone());
            if !minimum.converged || !minimum.optimal_value.is_finite() {
                return Err(self.no_convergence(format!(
                    "optimizer stopped after {} iterations",
                    minimum.iterations
                )));
            }
            let (phi, theta) = minimum.optimal_point.split_at(p);
            (phi.to_vec(), theta.to_vec())
        };

        if !is_stationary(&ar) {
            return Err(self.no_convergence("non-stationary AR part"));
        }
        if !is_invertible(&ma) {
            return Err(self.no_convergence("non-invertible MA part"));
        }

        let residuals = conditional_residuals(&centered, &ar, &ma);
        let css: f64 = residuals[scored_from..].iter().map(|e| e * e).sum();
        let sigma2 = css / sample_size as f64;
        if !(sigma2 > 0.0 && sigma2.is_finite()) {
            return Err(self.no_convergence(format!("degenerate residual variance {}", sigma2)));
        }

        let n = sample_size as f64;
        let k = self.order.parameter_count() as f64;
        let log_likelihood = -0.5 * n * ((2.0 * PI * sigma2).ln() + 1.0);
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let aicc = aic + 2.0 * k * (k + 1.0) / (n - k - 1.0);
        let bic = -2.0 * log_likelihood + k * n.ln();

        Ok(FittedArima {
            order: self.order,
            seasonal: self.seasonal,
            differencing,
            intercept,
            ar,
            ma,
            sigma2,
            log_likelihood,
            aic,
            aicc,
            bic,
            sample_size,
            history: values.to_vec(),
            centered,
            residuals,
        })
    }

    fn name(&self) -> String {
        model_name(self.order, self.seasonal)
    }
}

impl FittedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal(&self) -> Option<SeasonalDifferencing> {
        self.seasonal
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Small-sample corrected AIC
    pub fn aicc(&self) -> f64 {
        self.aicc
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Observations the likelihood was evaluated on
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Residuals on the differenced scale
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// ψ-weights of the model on the original scale
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        let numerator = LagPolynomial::moving_average(&self.ma);
        let denominator =
            LagPolynomial::autoregressive(&self.ar).multiply(&self.differencing.polynomial());
        numerator.divide_series(&denominator, count)
    }
}

impl FittedModel for FittedArima {
    fn forecast(&self, horizon: usize, level: f64) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(AnalysisError::InvalidParameter(
                "forecast horizon must be at least 1".to_string(),
            ));
        }
        if !(level > 0.0 && level < 1.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "confidence level must be between 0 and 1, got {}",
                level
            )));
        }

        let mut z = self.centered.clone();
        let mut e = self.residuals.clone();
        let mut history = self.history.clone();
        let mut values = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let next = arma_prediction(&z, &e, &self.ar, &self.ma, z.len());
            z.push(next);
            e.push(0.0);

            let point = self
                .differencing
                .integrate_next(next + self.intercept, &history);
            history.push(point);
            values.push(point);
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|err| AnalysisError::InvalidParameter(err.to_string()))?;
        let z_score = normal.inverse_cdf((1.0 + level) / 2.0);
        let sigma = self.sigma2.sqrt();

        let mut cumulative = 0.0;
        let intervals = self
            .psi_weights(horizon)
            .iter()
            .zip(&values)
            .map(|(psi, point)| {
                cumulative += psi * psi;
                let margin = z_score * sigma * cumulative.sqrt();
                (point - margin, point + margin)
            })
            .collect();

        ForecastResult::new_with_intervals(values, intervals, level)
    }

    fn fitted_values(&self) -> Vec<Option<f64>> {
        let lost = self.differencing.lost_observations();
        let first = lost + self.order.p.max(self.order.q);

        (0..self.history.len())
            .map(|t| {
                if t < first {
                    return None;
                }
                let index = t - lost;
                let predicted = self.centered[index] - self.residuals[index] + self.intercept;
                Some(
                    self.differencing
                        .integrate_next(predicted, &self.history[..t]),
                )
            })
            .collect()
    }

    fn name(&self) -> String {
        model_name(self.order, self.seasonal)
    }
}

fn model_name(order: ArimaOrder, seasonal: Option<SeasonalDifferencing>) -> String {
    match seasonal {
        Some(s) => format!("ARIMA{}(0,{},0)[{}]", order, s.order, s.period),
        None => format!("ARIMA{}", order),
    }
}

/// ARMA prediction of `z[t]` from values and residuals before `t`
fn arma_prediction(z: &[f64], e: &[f64], phi: &[f64], theta: &[f64], t: usize) -> f64 {
    let ar: f64 = phi
        .iter()
        .enumerate()
        .map(|(i, coefficient)| coefficient * z[t - 1 - i])
        .sum();
    let ma: f64 = theta
        .iter()
        .enumerate()
        .map(|(j, coefficient)| coefficient * e[t - 1 - j])
        .sum();
    ar + ma
}

/// One-step residuals conditioned on the first `max(p, q)` points
fn conditional_residuals(z: &[f64], phi: &[f64], theta: &[f64]) -> Vec<f64> {
    let condition = phi.len().max(theta.len());
    let mut residuals = vec![0.0; z.len()];
    for t in condition..z.len() {
        residuals[t] = z[t] - arma_prediction(z, &residuals, phi, theta, t);
    }
    residuals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal as NormalDist};

    fn ar1_series(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = NormalDist::new(0.0, 1.0).unwrap();
        let mut values = vec![50.0];
        for _ in 1..n {
            let last = values[values.len() - 1];
            values.push(50.0 + phi * (last - 50.0) + noise.sample(&mut rng));
        }
        values
    }

    #[test]
    fn test_recovers_ar_coefficient() {
        let values = ar1_series(0.6, 600, 7);
        let fitted = ArimaModel::new(ArimaOrder::new(1, 0, 0))
            .fit(&values)
            .unwrap();

        assert_relative_eq!(fitted.ar_coefficients()[0], 0.6, epsilon = 0.1);
        assert_relative_eq!(fitted.sigma2(), 1.0, epsilon = 0.2);
        assert_relative_eq!(fitted.intercept(), 50.0, epsilon = 1.0);
    }

    #[test]
    fn test_information_criteria() {
        let values = ar1_series(0.3, 200, 11);
        let fitted = ArimaModel::new(ArimaOrder::new(1, 0, 1))
            .fit(&values)
            .unwrap();

        let k = 4.0;
        let n = 199.0;
        assert_relative_eq!(fitted.aic(), -2.0 * fitted.log_likelihood() + 2.0 * k);
        assert_relative_eq!(
            fitted.aicc(),
            fitted.aic() + 2.0 * k * (k + 1.0) / (n - k - 1.0)
        );
        assert!(fitted.bic() > fitted.aic());
    }

    #[test]
    fn test_recovers_ar2_outside_unit_box() {
        // phi_1 = 1.5 lies outside (-1, 1) although the process is stationary
        let mut rng = StdRng::seed_from_u64(17);
        let noise = NormalDist::new(0.0, 1.0).unwrap();
        let mut values = vec![0.0, 0.0];
        for t in 2..2000 {
            let next = 1.5 * values[t - 1] - 0.6 * values[t - 2] + noise.sample(&mut rng);
            values.push(next);
        }
        let values: Vec<f64> = values.iter().map(|v| v + 60.0).collect();

        let fitted = ArimaModel::new(ArimaOrder::new(2, 0, 0))
            .fit(&values)
            .unwrap();

        assert_relative_eq!(fitted.ar_coefficients()[0], 1.5, epsilon = 0.05);
        assert_relative_eq!(fitted.ar_coefficients()[1], -0.6, epsilon = 0.05);
        assert_relative_eq!(fitted.sigma2(), 1.0, epsilon = 0.1);
    }

    #[test]
    fn test_common_sample_across_orders() {
        let values = ar1_series(0.5, 300, 23);
        // Largest d plus largest p of the two orders
        let start = 1 + 3;
        let small = ArimaModel::new(ArimaOrder::new(1, 0, 0))
            .conditioned_from(start)
            .fit(&values)
            .unwrap();
        let large = ArimaModel::new(ArimaOrder::new(3, 1, 0))
            .conditioned_from(start)
            .fit(&values)
            .unwrap();

        assert_eq!(small.sample_size(), 296);
        assert_eq!(large.sample_size(), 296);

        // Without conditioning each order keeps its own sample
        let own = ArimaModel::new(ArimaOrder::new(1, 0, 0))
            .fit(&values)
            .unwrap();
        assert_eq!(own.sample_size(), 299);
    }

    #[test]
    fn test_random_walk_forecast_is_flat() {
        let values: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 10.0 } else { 12.0 }).collect();
        let fitted = ArimaModel::new(ArimaOrder::new(0, 1, 0))
            .fit(&values)
            .unwrap();
        let forecast = fitted.forecast(3, 0.95).unwrap();

        // Mean of +2/-2 steps over 99 differences
        let drift = 2.0 / 99.0;
        assert_relative_eq!(forecast.values()[0], 12.0 + drift, epsilon = 1e-9);
        assert_relative_eq!(forecast.values()[2], 12.0 + 3.0 * drift, epsilon = 1e-9);

        // Interval width grows with sqrt(h) for a random walk
        let width = |i: usize| forecast.intervals()[i].1 - forecast.intervals()[i].0;
        assert_relative_eq!(width(1) / width(0), 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_fitted_values_alignment() {
        // Integrated AR(1), so the first differences are AR(1)
        let values: Vec<f64> = ar1_series(0.5, 120, 3)
            .iter()
            .scan(0.0, |level, v| {
                *level += v - 50.0;
                Some(*level)
            })
            .collect();
        let fitted = ArimaModel::new(ArimaOrder::new(1, 1, 0))
            .fit(&values)
            .unwrap();
        let in_sample = fitted.fitted_values();

        assert_eq!(in_sample.len(), values.len());
        assert!(in_sample[..2].iter().all(Option::is_none));
        assert!(in_sample[2..].iter().all(Option::is_some));
    }

    #[test]
    fn test_seasonal_differencing_name_and_alignment() {
        let values: Vec<f64> = (0..140)
            .map(|i| (40 + 3 * (i % 7) + i / 7) as f64)
            .collect();
        let model = ArimaModel::new(ArimaOrder::new(0, 0, 1))
            .with_seasonal_differencing(SeasonalDifferencing { order: 1, period: 7 });
        assert_eq!(model.name(), "ARIMA(0,0,1)(0,1,0)[7]");

        // Seasonal differences of this series are constant, so the variance is zero
        assert!(matches!(
            model.fit(&values),
            Err(AnalysisError::NoConvergence(_))
        ));
    }

    #[test]
    fn test_too_short() {
        let model = ArimaModel::new(ArimaOrder::new(3, 1, 3));
        assert!(matches!(
            model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_invalid_forecast_arguments() {
        let values = ar1_series(0.5, 80, 5);
        let fitted = ArimaModel::new(ArimaOrder::new(1, 0, 0))
            .fit(&values)
            .unwrap();
        assert!(fitted.forecast(0, 0.95).is_err());
        assert!(fitted.forecast(5, 1.0).is_err());
    }
}
