//! Forecasting models for daily AQI series

use crate::data::AqiSeries;
use crate::error::{AnalysisError, Result};
use crate::utils::{forecast_accuracy, future_dates, ForecastAccuracy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use tracing::info;

pub mod arima;
pub mod auto_arima;

pub use arima::{ArimaModel, FittedArima};
pub use auto_arima::{
    AutoArima, CandidateScore, OrderSearchConfig, OrderSearchResult, SearchStrategy,
};

/// Non-seasonal ARIMA order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// Autoregressive order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving-average order
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Estimated parameters: coefficients, intercept and innovation variance
    pub fn parameter_count(&self) -> usize {
        self.p + self.q + 2
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Seasonal differencing `(1 - L^period)^order`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalDifferencing {
    pub order: usize,
    pub period: usize,
}

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    values: Vec<f64>,
    intervals: Vec<(f64, f64)>,
    level: f64,
}

impl ForecastResult {
    /// Create a new forecast result with confidence intervals
    pub fn new_with_intervals(
        values: Vec<f64>,
        intervals: Vec<(f64, f64)>,
        level: f64,
    ) -> Result<Self> {
        if values.len() != intervals.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        Ok(Self {
            values,
            intervals,
            level,
        })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the (low, high) bounds per step
    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    /// Confidence level of the intervals
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Get the number of periods forecasted
    pub fn horizon(&self) -> usize {
        self.values.len()
    }
}

/// Model fitted to a series
pub trait FittedModel: Debug {
    /// Forecast `horizon` steps past the training data
    fn forecast(&self, horizon: usize, level: f64) -> Result<ForecastResult>;

    /// One-step in-sample predictions aligned with the training data
    fn fitted_values(&self) -> Vec<Option<f64>>;

    /// Name of the model
    fn name(&self) -> String;
}

/// Forecast model that can be fitted to a series of values
pub trait ForecastModel: Debug + Clone {
    /// The type of fitted model produced
    type Fitted: FittedModel;

    /// Fit the model to the values
    fn fit(&self, values: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> String;
}

/// Forecaster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub search: OrderSearchConfig,
    /// Days to forecast past the last observation
    pub horizon: usize,
    /// Coverage of the forecast intervals
    pub confidence_level: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            search: OrderSearchConfig::default(),
            horizon: 30,
            confidence_level: 0.95,
        }
    }
}

/// The selected model with its in-sample fit and forecast
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFit {
    pub order: ArimaOrder,
    pub seasonal: Option<SeasonalDifferencing>,
    pub ar_coefficients: Vec<f64>,
    pub ma_coefficients: Vec<f64>,
    pub intercept: f64,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    /// One-step predictions aligned with the input series
    pub fitted_values: Vec<Option<f64>>,
    pub forecast: Vec<f64>,
    /// (low, high) per forecast step
    pub confidence_interval: Vec<(f64, f64)>,
    pub forecast_dates: Vec<NaiveDate>,
    pub confidence_level: f64,
    /// Accuracy of the defined fitted values
    pub accuracy: ForecastAccuracy,
    /// Every order tried during the search
    pub candidates: Vec<CandidateScore>,
}

impl ModelFit {
    /// Model label such as `ARIMA(1,1,1)`
    pub fn model_name(&self) -> String {
        match self.seasonal {
            Some(s) => format!("ARIMA{}(0,{},0)[{}]", self.order, s.order, s.period),
            None => format!("ARIMA{}", self.order),
        }
    }
}

impl fmt::Display for ModelFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model:          {}", self.model_name())?;
        writeln!(f, "Intercept:      {:.4}", self.intercept)?;
        for (i, phi) in self.ar_coefficients.iter().enumerate() {
            writeln!(f, "ar.L{}:          {:.4}", i + 1, phi)?;
        }
        for (j, theta) in self.ma_coefficients.iter().enumerate() {
            writeln!(f, "ma.L{}:          {:.4}", j + 1, theta)?;
        }
        writeln!(f, "sigma2:         {:.4}", self.sigma2)?;
        writeln!(f, "Log likelihood: {:.3}", self.log_likelihood)?;
        writeln!(
            f,
            "AIC: {:.3}  AICc: {:.3}  BIC: {:.3}",
            self.aic, self.aicc, self.bic
        )?;
        writeln!(f, "In-sample:      {}", self.accuracy)?;
        write!(f, "Candidates:     {} evaluated", self.candidates.len())
    }
}

/// Selects an ARIMA order, fits it and forecasts
#[derive(Debug, Clone)]
pub struct Forecaster {
    config: ForecastConfig,
    search: AutoArima,
}

impl Forecaster {
    /// Create a forecaster
    pub fn new(config: ForecastConfig) -> Result<Self> {
        if config.horizon == 0 {
            return Err(AnalysisError::InvalidParameter(
                "forecast horizon must be at least 1".to_string(),
            ));
        }
        if !(config.confidence_level > 0.0 && config.confidence_level < 1.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "confidence level must be between 0 and 1, got {}",
                config.confidence_level
            )));
        }
        let search = AutoArima::new(config.search.clone())?;
        Ok(Self { config, search })
    }

    /// Search orders on `series`, then fit and forecast with the best one
    pub fn run(&self, series: &AqiSeries) -> Result<ModelFit> {
        let last_date = series
            .last_date()
            .ok_or(AnalysisError::InsufficientData { needed: 1, got: 0 })?;
        let values = series.values();

        let OrderSearchResult { best, candidates } = self.search.search(&values)?;
        let forecast = best.forecast(self.config.horizon, self.config.confidence_level)?;
        let fitted_values = best.fitted_values();
        let accuracy = forecast_accuracy(&fitted_values, &values)?;
        let forecast_dates = future_dates(last_date, self.config.horizon)?;

        info!(
            model = %best.name(),
            aicc = best.aicc(),
            candidates = candidates.len(),
            horizon = self.config.horizon,
            "selected forecasting model"
        );

        Ok(ModelFit {
            order: best.order(),
            seasonal: best.seasonal(),
            ar_coefficients: best.ar_coefficients().to_vec(),
            ma_coefficients: best.ma_coefficients().to_vec(),
            intercept: best.intercept(),
            sigma2: best.sigma2(),
            log_likelihood: best.log_likelihood(),
            aic: best.aic(),
            aicc: best.aicc(),
            bic: best.bic(),
            fitted_values,
            forecast: forecast.values().to_vec(),
            confidence_interval: forecast.intervals().to_vec(),
            forecast_dates,
            confidence_level: forecast.level(),
            accuracy,
            candidates,
        })
    }
}
