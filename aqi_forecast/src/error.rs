//! Error types for the aqi_forecast crate

use aqi_math::MathError;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the analysis pipeline. Every variant is terminal for a run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required column is missing or the file layout is unusable
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A date value could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Not enough observations for the requested computation
    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// No candidate model order could be fitted
    #[error("No convergence: {0}")]
    NoConvergence(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The same calendar date appears more than once
    #[error("Duplicate date {0} in series")]
    DuplicateDate(NaiveDate),

    /// Consecutive observations are more than one day apart
    #[error("Gap of {missing_days} missing day(s) after {after}")]
    GapDetected { after: NaiveDate, missing_days: i64 },

    /// Configuration file could not be read
    #[error("Config error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the CSV reader
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from numerical routines
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Config(err.to_string())
    }
}
