//! Utility functions for the aqi_forecast crate

use crate::error::{AnalysisError, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Create the `horizon` calendar days following `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    (1..=horizon as u64)
        .map(|offset| {
            last_date.checked_add_days(Days::new(offset)).ok_or_else(|| {
                AnalysisError::InvalidParameter(format!(
                    "date overflow {} days after {}",
                    offset, last_date
                ))
            })
        })
        .collect()
}

/// Calculate accuracy metrics over the points where a prediction exists
pub fn forecast_accuracy(predicted: &[Option<f64>], actual: &[f64]) -> Result<ForecastAccuracy> {
    if predicted.len() != actual.len() {
        return Err(AnalysisError::InvalidParameter(format!(
            "Prediction length ({}) doesn't match actual length ({})",
            predicted.len(),
            actual.len()
        )));
    }

    let pairs: Vec<(f64, f64)> = predicted
        .iter()
        .zip(actual)
        .filter_map(|(p, &a)| p.map(|p| (p, a)))
        .collect();
    if pairs.is_empty() {
        return Err(AnalysisError::InsufficientData { needed: 1, got: 0 });
    }

    let n = pairs.len() as f64;
    let mae = pairs.iter().map(|(p, a)| (a - p).abs()).sum::<f64>() / n;
    let rmse = (pairs.iter().map(|(p, a)| (a - p).powi(2)).sum::<f64>() / n).sqrt();

    // Zero actuals are skipped; AQI can legitimately be 0
    let nonzero: Vec<&(f64, f64)> = pairs.iter().filter(|(_, a)| *a != 0.0).collect();
    let mape = if nonzero.is_empty() {
        f64::NAN
    } else {
        nonzero
            .iter()
            .map(|(p, a)| ((a - p) / a).abs() * 100.0)
            .sum::<f64>()
            / nonzero.len() as f64
    };

    Ok(ForecastAccuracy {
        mae,
        rmse,
        mape,
        points: pairs.len(),
    })
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over non-zero actuals
    pub mape: f64,
    /// Number of compared points
    pub points: usize,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MAE {:.3}, RMSE {:.3}, MAPE {:.2}% over {} points",
            self.mae, self.rmse, self.mape, self.points
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_future_dates_cross_year() {
        let last = NaiveDate::from_ymd_opt(2023, 12, 30).unwrap();
        let dates = future_dates(last, 3).unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ]
        );
        assert!(future_dates(last, 0).unwrap().is_empty());
    }

    #[test]
    fn test_accuracy_skips_undefined() {
        let predicted = vec![None, Some(10.0), Some(22.0), Some(0.0)];
        let actual = vec![5.0, 8.0, 20.0, 0.0];
        let accuracy = forecast_accuracy(&predicted, &actual).unwrap();

        assert_eq!(accuracy.points, 3);
        assert_relative_eq!(accuracy.mae, 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(accuracy.rmse, (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(accuracy.mape, (25.0 + 10.0) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_accuracy_length_mismatch() {
        assert!(forecast_accuracy(&[Some(1.0)], &[1.0, 2.0]).is_err());
        assert!(forecast_accuracy(&[None, None], &[1.0, 2.0]).is_err());
    }
}
