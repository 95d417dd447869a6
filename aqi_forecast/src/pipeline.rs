//! End-to-end analysis run
//!
//! Loader → Indexer → Decomposer → Stationarity Tester → Forecaster →
//! Detrender. Each stage reads the indexed series and returns a new value;
//! the first error aborts the run.

use crate::config::PipelineConfig;
use crate::data::{AqiSeries, Indexer, Loader};
use crate::decomposition::{Decomposer, DecompositionResult};
use crate::detrend::{DetrendResult, Detrender};
use crate::error::Result;
use crate::models::{Forecaster, ModelFit};
use crate::plot::{
    decomposition_chart, detrend_chart, fitted_chart, forecast_chart, series_chart, PlotConfig,
};
use crate::stationarity::{StationarityResult, StationarityTester};
use std::path::Path;
use tracing::info;

/// Everything one run produces
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub series: AqiSeries,
    pub decomposition: DecompositionResult,
    /// ADF test on the AQI values
    pub stationarity: StationarityResult,
    /// ADF test on the first differences
    pub differenced_stationarity: StationarityResult,
    pub model: ModelFit,
    pub detrend: DetrendResult,
}

impl AnalysisReport {
    /// Render the five charts
    pub fn charts(&self, config: &PlotConfig) -> Result<Vec<String>> {
        Ok(vec![
            series_chart(&self.series, config)?,
            decomposition_chart(&self.decomposition, config)?,
            fitted_chart(&self.series, &self.model, config)?,
            forecast_chart(&self.series, &self.model, config)?,
            detrend_chart(&self.series, &self.detrend, config)?,
        ])
    }
}

/// Runs every stage in order
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    loader: Loader,
    indexer: Indexer,
    decomposer: Decomposer,
    tester: StationarityTester,
    forecaster: Forecaster,
    detrender: Detrender,
}

impl AnalysisPipeline {
    /// Build every stage, validating the configuration up front
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            loader: Loader::new(config.loader.clone())?,
            indexer: Indexer::new(config.indexer.clone())?,
            decomposer: Decomposer::new(config.decomposition)?,
            tester: StationarityTester::new(config.stationarity),
            forecaster: Forecaster::new(config.forecast.clone())?,
            detrender: Detrender::new(config.detrend)?,
        })
    }

    /// Load, index and analyse a CSV file
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisReport> {
        let records = self.loader.from_csv(path)?;
        let series = self.indexer.index(records)?;
        self.run_series(series)
    }

    /// Analyse an already indexed series
    pub fn run_series(&self, series: AqiSeries) -> Result<AnalysisReport> {
        info!(days = series.len(), "starting analysis");

        let decomposition = self.decomposer.decompose(&series)?;
        let stationarity = self.tester.test(&series)?;
        let differenced_stationarity = self.tester.test_differenced(&series, 1)?;
        let model = self.forecaster.run(&series)?;
        let detrend = self.detrender.detrend(&series)?;

        info!(
            model = %model.model_name(),
            verdict = %stationarity.verdict,
            "analysis complete"
        );

        Ok(AnalysisReport {
            series,
            decomposition,
            stationarity,
            differenced_stationarity,
            model,
            detrend,
        })
    }
}
