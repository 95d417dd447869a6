//! # AQI Math
//!
//! Numerical building blocks used by the air quality analysis pipeline:
//! rolling statistics, the combined differencing operator, least-squares
//! regression and lag-polynomial algebra. Differencing itself comes from
//! `anofox-forecast` and the linear algebra from `nalgebra`.

use thiserror::Error;

pub mod differencing;
pub mod moving_averages;
pub mod polynomial;
pub mod regression;

/// Errors that can occur in numerical calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Arithmetic mean of a slice, `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
