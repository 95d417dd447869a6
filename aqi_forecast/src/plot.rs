//! Text charts for the console
//!
//! Every chart is rendered to a `String`; printing is left to the caller.

use crate::data::AqiSeries;
use crate::decomposition::DecompositionResult;
use crate::detrend::DetrendResult;
use crate::error::{AnalysisError, Result};
use crate::models::ModelFit;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const LABEL_WIDTH: usize = 10;

/// Chart settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Print charts at all
    pub enabled: bool,
    /// Plot area width in characters
    pub width: usize,
    /// Plot area height in lines
    pub height: usize,
    /// Observed days shown before the forecast
    pub forecast_context: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 72,
            height: 16,
            forecast_context: 90,
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    label: String,
    glyph: char,
    points: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
struct Band {
    label: String,
    glyph: char,
    low: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
}

/// A line chart drawn with characters
#[derive(Debug, Clone)]
pub struct TextChart {
    title: String,
    width: usize,
    height: usize,
    lines: Vec<Line>,
    band: Option<Band>,
    x_labels: Option<(String, String)>,
}

impl TextChart {
    /// Create an empty chart
    pub fn new(title: impl Into<String>, width: usize, height: usize) -> Result<Self> {
        if width < 10 || height < 3 {
            return Err(AnalysisError::InvalidParameter(format!(
                "chart must be at least 10x3 characters, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            title: title.into(),
            width,
            height,
            lines: Vec::new(),
            band: None,
            x_labels: None,
        })
    }

    /// Add a line; later lines are drawn over earlier ones
    pub fn line(mut self, label: impl Into<String>, glyph: char, points: Vec<Option<f64>>) -> Self {
        self.lines.push(Line {
            label: label.into(),
            glyph,
            points,
        });
        self
    }

    /// Shade the area between `low` and `high`, below every line
    pub fn band(
        mut self,
        label: impl Into<String>,
        glyph: char,
        low: Vec<Option<f64>>,
        high: Vec<Option<f64>>,
    ) -> Self {
        self.band = Some(Band {
            label: label.into(),
            glyph,
            low,
            high,
        });
        self
    }

    /// Labels printed under the first and last column
    pub fn x_labels(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.x_labels = Some((first.into(), last.into()));
        self
    }

    /// Label the x axis with the first and last date
    pub fn date_range(self, dates: &[NaiveDate]) -> Self {
        match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => self.x_labels(first.to_string(), last.to_string()),
            _ => self,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);

        let Some((min, max)) = self.value_range() else {
            let _ = writeln!(out, "{:>width$}(no data)", "", width = LABEL_WIDTH);
            return out;
        };

        let count = self.point_count();
        let mut grid = vec![vec![' '; self.width]; self.height];

        if let Some(band) = &self.band {
            for (i, (low, high)) in band.low.iter().zip(&band.high).enumerate() {
                if let (Some(low), Some(high)) = (low, high) {
                    let col = self.column(i, count);
                    let (top, bottom) = (self.row(*high, min, max), self.row(*low, min, max));
                    for row in grid.iter_mut().take(bottom.max(top) + 1).skip(top.min(bottom)) {
                        row[col] = band.glyph;
                    }
                }
            }
        }

        for line in &self.lines {
            for (i, value) in line.points.iter().enumerate() {
                if let Some(v) = value {
                    grid[self.row(*v, min, max)][self.column(i, count)] = line.glyph;
                }
            }
        }

        let middle = self.height / 2;
        for (r, row) in grid.iter().enumerate() {
            let label = if r == 0 {
                format!("{:>9.1}", max)
            } else if r == self.height - 1 {
                format!("{:>9.1}", min)
            } else if r == middle {
                format!("{:>9.1}", (max + min) / 2.0)
            } else {
                String::new()
            };
            let body: String = row.iter().collect();
            let _ = writeln!(out, "{:>9} |{}", label, body.trim_end());
        }
        let _ = writeln!(
            out,
            "{:>width$}+{}",
            "",
            "-".repeat(self.width),
            width = LABEL_WIDTH
        );

        if let Some((first, last)) = &self.x_labels {
            let gap = self.width.saturating_sub(first.len() + last.len()).max(1);
            let _ = writeln!(
                out,
                "{:>width$}{}{}{}",
                "",
                first,
                " ".repeat(gap),
                last,
                width = LABEL_WIDTH + 1
            );
        }

        let mut legend: Vec<String> = self
            .lines
            .iter()
            .map(|l| format!("{} {}", l.glyph, l.label))
            .collect();
        if let Some(band) = &self.band {
            legend.push(format!("{} {}", band.glyph, band.label));
        }
        let _ = writeln!(
            out,
            "{:>width$}{}",
            "",
            legend.join("   "),
            width = LABEL_WIDTH + 1
        );

        out
    }

    fn point_count(&self) -> usize {
        let lines = self.lines.iter().map(|l| l.points.len());
        let band = self.band.iter().map(|b| b.low.len().max(b.high.len()));
        lines.chain(band).max().unwrap_or(0)
    }

    fn value_range(&self) -> Option<(f64, f64)> {
        let lines = self.lines.iter().flat_map(|l| l.points.iter());
        let band = self
            .band
            .iter()
            .flat_map(|b| b.low.iter().chain(b.high.iter()));

        let (min, max) = lines
            .chain(band)
            .filter_map(|v| *v)
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        if min > max {
            None
        } else if (max - min).abs() < f64::EPSILON {
            Some((min - 1.0, max + 1.0))
        } else {
            Some((min, max))
        }
    }

    fn column(&self, index: usize, count: usize) -> usize {
        if count <= 1 {
            0
        } else {
            index * (self.width - 1) / (count - 1)
        }
    }

    fn row(&self, value: f64, min: f64, max: f64) -> usize {
        let scaled = (max - value) / (max - min) * (self.height - 1) as f64;
        (scaled.round().max(0.0) as usize).min(self.height - 1)
    }
}

fn defined(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|v| Some(*v)).collect()
}

/// Daily AQI over the whole series
pub fn series_chart(series: &AqiSeries, config: &PlotConfig) -> Result<String> {
    Ok(TextChart::new("Daily AQI", config.width, config.height)?
        .line("AQI", '*', defined(&series.values()))
        .date_range(&series.dates())
        .render())
}

/// Observed, trend, seasonal and residual panels
pub fn decomposition_chart(result: &DecompositionResult, config: &PlotConfig) -> Result<String> {
    let height = (config.height / 2).max(3);
    let panels = [
        ("Observed", defined(&result.observed)),
        ("Trend", result.trend.clone()),
        ("Seasonal", defined(&result.seasonal)),
        ("Residual", result.residual.clone()),
    ];

    let mut out = format!(
        "Seasonal decomposition ({}, period {})\n",
        result.model, result.period
    );
    for (title, points) in panels {
        let chart = TextChart::new(title, config.width, height)?
            .line(title.to_lowercase(), '*', points)
            .date_range(&result.dates);
        out.push_str(&chart.render());
    }
    Ok(out)
}

/// Observed values against in-sample predictions
pub fn fitted_chart(series: &AqiSeries, fit: &ModelFit, config: &PlotConfig) -> Result<String> {
    Ok(TextChart::new(
        format!("Original vs fitted, {}", fit.model_name()),
        config.width,
        config.height,
    )?
    .line("observed", '.', defined(&series.values()))
    .line("fitted", '*', fit.fitted_values.clone())
    .date_range(&series.dates())
    .render())
}

/// The last observed days followed by the forecast and its interval
pub fn forecast_chart(series: &AqiSeries, fit: &ModelFit, config: &PlotConfig) -> Result<String> {
    let values = series.values();
    let context = config.forecast_context.min(values.len());
    let start = values.len() - context;
    let horizon = fit.forecast.len();

    let mut observed = defined(&values[start..]);
    observed.extend(std::iter::repeat(None).take(horizon));

    let mut forecast = vec![None; context];
    let mut low = vec![None; context];
    let mut high = vec![None; context];
    forecast.extend(fit.forecast.iter().map(|v| Some(*v)));
    low.extend(fit.confidence_interval.iter().map(|(l, _)| Some(*l)));
    high.extend(fit.confidence_interval.iter().map(|(_, h)| Some(*h)));

    let dates = series.dates();
    let first = dates.get(start).map(|d| d.to_string()).unwrap_or_default();
    let last = fit
        .forecast_dates
        .last()
        .map(|d| d.to_string())
        .unwrap_or_default();

    Ok(TextChart::new(
        format!("{}-day forecast, {}", horizon, fit.model_name()),
        config.width,
        config.height,
    )?
    .band(
        format!("{:.0}% interval", fit.confidence_level * 100.0),
        ':',
        low,
        high,
    )
    .line("observed", '.', observed)
    .line("forecast", '*', forecast)
    .x_labels(first, last)
    .render())
}

/// Observed values with the rolling mean, and the detrended remainder
pub fn detrend_chart(
    series: &AqiSeries,
    result: &DetrendResult,
    config: &PlotConfig,
) -> Result<String> {
    let trend = TextChart::new(
        format!("Rolling mean, window {}", result.window),
        config.width,
        config.height,
    )?
    .line("observed", '.', defined(&series.values()))
    .line("rolling mean", '*', result.moving_average.clone())
    .date_range(&result.dates);

    let detrended = TextChart::new("Detrended AQI", config.width, config.height)?
        .line("detrended", '*', result.detrended.clone())
        .date_range(&result.dates);

    Ok(format!("{}{}", trend.render(), detrended.render()))
}
