//! Date parsing and daily indexing

use crate::data::loader::LoadedRecord;
use crate::data::series::{AqiSeries, Observation};
use crate::error::{AnalysisError, Result};
use chrono::{Days, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What to do when a date appears more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail with [`AnalysisError::DuplicateDate`]
    #[default]
    Reject,
    /// Merge the rows into one, averaging their values
    Mean,
}

/// What to do when consecutive dates are more than one day apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapPolicy {
    /// Insert the missing days, carrying the previous value forward
    #[default]
    ForwardFill,
    /// Fail with [`AnalysisError::GapDetected`]
    Reject,
}

/// Indexer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// chrono format strings tried in order
    pub date_formats: Vec<String>,
    pub duplicates: DuplicatePolicy,
    pub gaps: GapPolicy,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%m/%d/%Y".to_string(),
                "%Y/%m/%d".to_string(),
            ],
            duplicates: DuplicatePolicy::default(),
            gaps: GapPolicy::default(),
        }
    }
}

/// Turns loaded records into a daily [`AqiSeries`]
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    config: IndexerConfig,
}

impl Indexer {
    /// Create an indexer
    pub fn new(config: IndexerConfig) -> Result<Self> {
        if config.date_formats.is_empty() {
            return Err(AnalysisError::InvalidParameter(
                "at least one date format is required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Parse a date with the first format that accepts it
    pub fn parse_date(&self, raw: &str) -> Result<NaiveDate> {
        let raw = raw.trim();
        self.config
            .date_formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
            .ok_or_else(|| {
                AnalysisError::Parse(format!(
                    "unrecognised date '{}' (expected one of: {})",
                    raw,
                    self.config.date_formats.join(", ")
                ))
            })
    }

    /// Sort by date and enforce one observation per calendar day.
    pub fn index(&self, records: Vec<LoadedRecord>) -> Result<AqiSeries> {
        if records.is_empty() {
            return Err(AnalysisError::InsufficientData { needed: 1, got: 0 });
        }

        let mut observations = records
            .into_iter()
            .map(|record| {
                Ok(Observation {
                    date: self.parse_date(&record.date)?,
                    aqi_value: record.aqi_value,
                    main_pollutant: record.main_pollutant,
                    site_name: record.site_name,
                    site_id: record.site_id,
                    source: record.source,
                    imputed: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Stable, so the first row of a duplicated date stays first
        observations.sort_by_key(|o| o.date);

        let observations = self.merge_duplicates(observations)?;
        let observations = self.fill_gaps(observations)?;

        info!(
            days = observations.len(),
            first = %observations[0].date,
            last = %observations[observations.len() - 1].date,
            "indexed daily series"
        );

        Ok(AqiSeries::from_sorted(observations))
    }

    fn merge_duplicates(&self, observations: Vec<Observation>) -> Result<Vec<Observation>> {
        let mut merged: Vec<Observation> = Vec::with_capacity(observations.len());
        let mut group_sum = 0u64;
        let mut group_len = 0u64;
        let mut merged_days = 0usize;

        for observation in observations {
            let repeats_last = merged.last().map(|o| o.date) == Some(observation.date);
            if !repeats_last {
                group_sum = u64::from(observation.aqi_value);
                group_len = 1;
                merged.push(observation);
                continue;
            }

            match self.config.duplicates {
                DuplicatePolicy::Reject => {
                    return Err(AnalysisError::DuplicateDate(observation.date));
                }
                DuplicatePolicy::Mean => {
                    if group_len == 1 {
                        merged_days += 1;
                    }
                    group_sum += u64::from(observation.aqi_value);
                    group_len += 1;
                    if let Some(last) = merged.last_mut() {
                        last.aqi_value = rounded_mean(group_sum, group_len);
                    }
                }
            }
        }

        if merged_days > 0 {
            debug!(merged_days, "averaged duplicate dates");
        }
        Ok(merged)
    }

    fn fill_gaps(&self, observations: Vec<Observation>) -> Result<Vec<Observation>> {
        let mut filled: Vec<Observation> = Vec::with_capacity(observations.len());
        let mut imputed = 0i64;

        for observation in observations {
            let gap_start = filled
                .last()
                .filter(|previous| observation.date - previous.date > Duration::days(1))
                .cloned();
            let template = match gap_start {
                Some(previous) => previous,
                None => {
                    filled.push(observation);
                    continue;
                }
            };

            let missing_days = (observation.date - template.date).num_days() - 1;
            if self.config.gaps == GapPolicy::Reject {
                return Err(AnalysisError::GapDetected {
                    after: template.date,
                    missing_days,
                });
            }

            for offset in 1..=missing_days as u64 {
                let date = template
                    .date
                    .checked_add_days(Days::new(offset))
                    .ok_or_else(|| {
                        AnalysisError::InvalidParameter(format!(
                            "date overflow after {}",
                            template.date
                        ))
                    })?;
                filled.push(Observation {
                    date,
                    imputed: true,
                    ..template.clone()
                });
            }
            imputed += missing_days;
            filled.push(observation);
        }

        if imputed > 0 {
            warn!(imputed, "filled missing days by carrying values forward");
        }
        Ok(filled)
    }
}

/// Integer mean rounded half away from zero
fn rounded_mean(sum: u64, count: u64) -> u32 {
    ((sum * 2 + count) / (count * 2)) as u32
}
