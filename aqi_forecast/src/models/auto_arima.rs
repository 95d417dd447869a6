//! Automatic ARIMA order selection
//!
//! Candidates are ranked by AICc. Within `1e-9` the simpler model wins:
//! smaller `p + q`, then smaller `d`, then smaller `p`. Every candidate is
//! scored on the same observations: those after the largest differencing
//! and AR/MA lag the grid allows.

use crate::error::{AnalysisError, Result};
use crate::models::arima::{ArimaModel, FittedArima};
use crate::models::{ArimaOrder, FittedModel, ForecastModel, SeasonalDifferencing};
use crate::stationarity::StationarityTester;
use aqi_math::differencing::{seasonal_difference, Differencing};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// AICc differences below this are ties
const AICC_TIE: f64 = 1e-9;

/// Seasonal differencing is used when it leaves less than this share of the
/// variance
const SEASONAL_VARIANCE_RATIO: f64 = 0.7;

/// How the (p, q) grid is explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// Neighbourhood search from a few starting orders
    #[default]
    Stepwise,
    /// Every order in the grid
    Exhaustive,
}

/// Order search bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSearchConfig {
    pub max_p: usize,
    pub max_q: usize,
    /// Regular differencing orders to try
    pub d_candidates: Vec<usize>,
    pub strategy: SearchStrategy,
    /// Consider seasonal differencing at `seasonal_period`
    pub seasonal: bool,
    pub seasonal_period: usize,
    /// Only try the smallest `d` whose differences test stationary
    pub select_d_by_test: bool,
}

impl Default for OrderSearchConfig {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_q: 3,
            d_candidates: vec![0, 1, 2],
            strategy: SearchStrategy::Stepwise,
            seasonal: false,
            seasonal_period: 7,
            select_d_by_test: false,
        }
    }
}

/// Outcome of one candidate order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub order: ArimaOrder,
    /// `None` when the fit was not successful
    pub aicc: Option<f64>,
}

/// Best model and every candidate evaluated on the way
#[derive(Debug, Clone)]
pub struct OrderSearchResult {
    pub best: FittedArima,
    pub candidates: Vec<CandidateScore>,
}

/// Automatic ARIMA order search
#[derive(Debug, Clone)]
pub struct AutoArima {
    config: OrderSearchConfig,
}

impl AutoArima {
    /// Create a new order search
    pub fn new(config: OrderSearchConfig) -> Result<Self> {
        if config.d_candidates.is_empty() {
            return Err(AnalysisError::InvalidParameter(
                "at least one differencing order is required".to_string(),
            ));
        }
        if config.seasonal && config.seasonal_period < 2 {
            return Err(AnalysisError::InvalidParameter(format!(
                "seasonal period must be at least 2, got {}",
                config.seasonal_period
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &OrderSearchConfig {
        &self.config
    }

    /// Search the configured grid and return the best successful fit
    pub fn search(&self, values: &[f64]) -> Result<OrderSearchResult> {
        let seasonal = if self.config.seasonal {
            let order = suggest_seasonal_differencing(values, self.config.seasonal_period);
            info!(
                order,
                period = self.config.seasonal_period,
                "seasonal differencing"
            );
            Some(SeasonalDifferencing {
                order,
                period: self.config.seasonal_period,
            })
            .filter(|s| s.order > 0)
        } else {
            None
        };

        let d_values = self.d_values(values, seasonal);
        let sample_start = d_values.iter().max().copied().unwrap_or(0)
            + seasonal.map_or(0, |s| s.order * s.period)
            + self.config.max_p.max(self.config.max_q);
        debug!(sample_start, "common likelihood sample");
        let mut search = SearchState::new(values, seasonal, sample_start);

        for d in d_values {
            match self.config.strategy {
                SearchStrategy::Stepwise => self.stepwise(&mut search, d),
                SearchStrategy::Exhaustive => {
                    for p in 0..=self.config.max_p {
                        for q in 0..=self.config.max_q {
                            search.evaluate(ArimaOrder::new(p, d, q));
                        }
                    }
                }
            }
        }

        let SearchState {
            best, candidates, ..
        } = search;
        let best = best.ok_or_else(|| {
            AnalysisError::NoConvergence(format!(
                "none of the {} candidate orders could be fitted",
                candidates.len()
            ))
        })?;

        Ok(OrderSearchResult { best, candidates })
    }

    fn d_values(&self, values: &[f64], seasonal: Option<SeasonalDifferencing>) -> Vec<usize> {
        let mut candidates = self.config.d_candidates.clone();
        candidates.sort_unstable();
        candidates.dedup();

        if !self.config.select_d_by_test {
            return candidates;
        }

        let tester = StationarityTester::default();
        for &d in &candidates {
            let differencing = match seasonal {
                Some(s) => Differencing::seasonal(d, s.order, s.period),
                None => Differencing::regular(d),
            };
            // A test that cannot be run counts as not stationary
            match tester.test_series(&differencing.apply(values)) {
                Ok(result) => {
                    debug!(d, p_value = result.p_value, "differencing order test");
                    if result.verdict.is_stationary() {
                        return vec![d];
                    }
                }
                Err(err) => debug!(d, error = %err, "differencing order test failed"),
            }
        }

        // Nothing tested stationary: fall back to the largest order
        candidates.last().map(|d| vec![*d]).unwrap_or_default()
    }

    fn stepwise(&self, search: &mut SearchState<'_>, d: usize) {
        let (max_p, max_q) = (self.config.max_p, self.config.max_q);
        let starts = [(2, 2), (0, 0), (1, 0), (0, 1)];

        let mut current: Option<(ArimaOrder, f64)> = None;
        for (p, q) in starts {
            let order = ArimaOrder::new(p.min(max_p), d, q.min(max_q));
            if let Some(aicc) = search.evaluate(order) {
                if current.map_or(true, |c| outranks((order, aicc), c)) {
                    current = Some((order, aicc));
                }
            }
        }

        while let Some(incumbent) = current {
            let mut improved = None;
            for (p, q) in neighbours(incumbent.0.p, incumbent.0.q, max_p, max_q) {
                let order = ArimaOrder::new(p, d, q);
                if let Some(aicc) = search.evaluate(order) {
                    let best_so_far = improved.unwrap_or(incumbent);
                    if outranks((order, aicc), best_so_far) {
                        improved = Some((order, aicc));
                    }
                }
            }

            match improved {
                Some(next) => current = Some(next),
                None => break,
            }
        }
    }
}

/// Fits performed so far and the best one
struct SearchState<'a> {
    values: &'a [f64],
    seasonal: Option<SeasonalDifferencing>,
    sample_start: usize,
    tried: HashSet<ArimaOrder>,
    candidates: Vec<CandidateScore>,
    best: Option<FittedArima>,
}

impl<'a> SearchState<'a> {
    fn new(values: &'a [f64], seasonal: Option<SeasonalDifferencing>, sample_start: usize) -> Self {
        Self {
            values,
            seasonal,
            sample_start,
            tried: HashSet::new(),
            candidates: Vec::new(),
            best: None,
        }
    }

    /// Fit `order` once and return its AICc; `None` when already tried or
    /// unsuccessful
    fn evaluate(&mut self, order: ArimaOrder) -> Option<f64> {
        if !self.tried.insert(order) {
            return None;
        }

        let mut model = ArimaModel::new(order).conditioned_from(self.sample_start);
        if let Some(seasonal) = self.seasonal {
            model = model.with_seasonal_differencing(seasonal);
        }

        match model.fit(self.values) {
            Ok(fitted) => {
                let aicc = fitted.aicc();
                debug!(model = %fitted.name(), aicc, "candidate fitted");
                self.candidates.push(CandidateScore {
                    order,
                    aicc: Some(aicc),
                });

                let replace = match &self.best {
                    Some(best) => outranks((order, aicc), (best.order(), best.aicc())),
                    None => true,
                };
                if replace {
                    self.best = Some(fitted);
                }
                Some(aicc)
            }
            Err(err) => {
                debug!(model = %model.name(), error = %err, "candidate rejected");
                self.candidates.push(CandidateScore { order, aicc: None });
                None
            }
        }
    }
}

/// Whether `candidate` should replace `incumbent`
fn outranks(candidate: (ArimaOrder, f64), incumbent: (ArimaOrder, f64)) -> bool {
    let (a, a_score) = candidate;
    let (b, b_score) = incumbent;
    let diff = a_score - b_score;
    if diff < -AICC_TIE {
        return true;
    }
    if diff > AICC_TIE {
        return false;
    }
    (a.p + a.q, a.d, a.p) < (b.p + b.q, b.d, b.p)
}

/// Orders one step away in `p`, `q` or both, within the bounds
fn neighbours(p: usize, q: usize, max_p: usize, max_q: usize) -> Vec<(usize, usize)> {
    let mut result = Vec::with_capacity(8);
    for dp in -1i64..=1 {
        for dq in -1i64..=1 {
            if dp == 0 && dq == 0 {
                continue;
            }
            let np = p as i64 + dp;
            let nq = q as i64 + dq;
            if np >= 0 && nq >= 0 && np <= max_p as i64 && nq <= max_q as i64 {
                result.push((np as usize, nq as usize));
            }
        }
    }
    result
}

/// Seasonal differencing order suggested by the variance of lag-`period`
/// differences: 1 when they keep less than 70% of the variance, else 0.
pub fn suggest_seasonal_differencing(values: &[f64], period: usize) -> usize {
    if period < 2 || values.len() < 2 * period {
        return 0;
    }

    let seasonal_diffs = seasonal_difference(values, 1, period);

    if population_variance(&seasonal_diffs) < population_variance(values) * SEASONAL_VARIANCE_RATIO
    {
        1
    } else {
        0
    }
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
