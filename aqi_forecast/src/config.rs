//! Pipeline configuration
//!
//! Every section is optional in the JSON file; missing fields take their
//! defaults. Values are validated by the stage constructors.

use crate::data::{IndexerConfig, LoaderConfig};
use crate::decomposition::DecompositionConfig;
use crate::detrend::DetrendConfig;
use crate::error::Result;
use crate::models::ForecastConfig;
use crate::plot::PlotConfig;
use crate::stationarity::StationarityConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Settings for every pipeline stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub loader: LoaderConfig,
    pub indexer: IndexerConfig,
    pub decomposition: DecompositionConfig,
    pub stationarity: StationarityConfig,
    pub forecast: ForecastConfig,
    pub detrend: DetrendConfig,
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Read a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse a JSON configuration
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Render as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
