//! Loading and indexing of daily AQI data
//!
//! The [`Loader`] reads and cleans CSV rows, the [`Indexer`] parses dates and
//! produces an [`AqiSeries`] with exactly one observation per calendar day.

pub mod indexer;
pub mod loader;
pub mod series;

pub use indexer::{DuplicatePolicy, GapPolicy, Indexer, IndexerConfig};
pub use loader::{normalize_column_name, LoadedRecord, Loader, LoaderConfig, MISSING_SENTINEL};
pub use series::{AqiSeries, Observation, Pollutant};
