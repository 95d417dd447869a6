//! # AQI Forecast
//!
//! A Rust library for analysing a daily air quality index (AQI) series.
//!
//! ## Features
//!
//! - CSV loading with column normalization and missing-value cleanup
//! - Daily indexing with duplicate and gap policies
//! - Classical seasonal decomposition (additive or multiplicative)
//! - Augmented Dickey-Fuller stationarity test with MacKinnon p-values
//! - ARIMA forecasting with automated (p, d, q) order search
//! - Rolling-mean detrending
//! - Text charts for the console
//!
//! ## Quick Start
//!
//! ```no_run
//! use aqi_forecast::config::PipelineConfig;
//! use aqi_forecast::pipeline::AnalysisPipeline;
//!
//! let pipeline = AnalysisPipeline::new(&PipelineConfig::default())?;
//! let report = pipeline.run("data/aqi_daily.csv")?;
//!
//! println!("{}", report.stationarity);
//! println!("{}", report.model);
//! for chart in report.charts(&Default::default())? {
//!     println!("{}", chart);
//! }
//! # Ok::<(), aqi_forecast::AnalysisError>(())
//! ```

pub mod config;
pub mod data;
pub mod decomposition;
pub mod detrend;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod plot;
pub mod stationarity;
pub mod synthetic;
pub mod utils;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{AqiSeries, Indexer, Loader, Observation};
pub use crate::decomposition::{Decomposer, DecompositionResult};
pub use crate::detrend::{DetrendResult, Detrender};
pub use crate::error::{AnalysisError, Result};
pub use crate::models::{ForecastModel, Forecaster, ModelFit};
pub use crate::pipeline::{AnalysisPipeline, AnalysisReport};
pub use crate::stationarity::{StationarityResult, StationarityTester, Verdict};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
