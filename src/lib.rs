//! # AQI Watch workspace
//!
//! Umbrella crate for the AQI analysis workspace.
//!
//! - [`math`]: numerical building blocks (moving averages, differencing,
//!   least squares, Nelder-Mead, polynomial roots)
//! - [`forecast`]: loading, decomposition, stationarity testing, ARIMA
//!   forecasting and detrending of daily AQI series
//!
//! ## Example
//!
//! ```
//! use aqi_watch_workspace::forecast::synthetic::SyntheticSeries;
//!
//! let series = SyntheticSeries { days: 30, ..SyntheticSeries::default() }
//!     .generate()
//!     .unwrap();
//! assert_eq!(series.len(), 30);
//! ```

pub use aqi_forecast as forecast;
pub use aqi_math as math;

pub use aqi_forecast::{AnalysisError, AnalysisPipeline, AnalysisReport, PipelineConfig};
