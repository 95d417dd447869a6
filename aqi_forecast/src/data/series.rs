//! Typed observations and the date-indexed AQI series

use crate::error::{AnalysisError, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Pollutant reported as the main contributor to a day's AQI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    Ozone,
    Pm25,
    Pm10,
    CarbonMonoxide,
    NitrogenDioxide,
    SulfurDioxide,
    /// Any label not recognised above, kept verbatim
    Other(String),
}

impl FromStr for Pollutant {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Ok(match key.as_str() {
            "ozone" | "o3" => Pollutant::Ozone,
            "pm25" => Pollutant::Pm25,
            "pm10" => Pollutant::Pm10,
            "co" | "carbonmonoxide" => Pollutant::CarbonMonoxide,
            "no2" | "nitrogendioxide" => Pollutant::NitrogenDioxide,
            "so2" | "sulfurdioxide" => Pollutant::SulfurDioxide,
            _ => Pollutant::Other(s.trim().to_string()),
        })
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pollutant::Ozone => write!(f, "Ozone"),
            Pollutant::Pm25 => write!(f, "PM2.5"),
            Pollutant::Pm10 => write!(f, "PM10"),
            Pollutant::CarbonMonoxide => write!(f, "CO"),
            Pollutant::NitrogenDioxide => write!(f, "NO2"),
            Pollutant::SulfurDioxide => write!(f, "SO2"),
            Pollutant::Other(label) => write!(f, "{}", label),
        }
    }
}

/// One day of AQI data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar date of the reading
    pub date: NaiveDate,
    /// Daily AQI value
    pub aqi_value: u32,
    /// Main pollutant, when reported
    pub main_pollutant: Option<Pollutant>,
    /// Monitoring site name
    pub site_name: Option<String>,
    /// Monitoring site identifier
    pub site_id: Option<String>,
    /// Numeric code of the data source
    pub source: Option<u32>,
    /// True when the row was created by gap filling
    pub imputed: bool,
}

impl Observation {
    /// Observation with only a date and a value
    pub fn new(date: NaiveDate, aqi_value: u32) -> Self {
        Self {
            date,
            aqi_value,
            main_pollutant: None,
            site_name: None,
            site_id: None,
            source: None,
            imputed: false,
        }
    }
}

/// Daily AQI observations in ascending date order.
///
/// Series built by the [`Indexer`](crate::data::Indexer) have unique,
/// consecutive dates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AqiSeries {
    observations: Vec<Observation>,
}

impl AqiSeries {
    /// Wrap observations already sorted and de-duplicated
    pub(crate) fn from_sorted(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Build a series of consecutive days starting at `start`
    pub fn from_values(start: NaiveDate, values: &[u32]) -> Result<Self> {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                start
                    .checked_add_days(Days::new(i as u64))
                    .map(|date| Observation::new(date, value))
                    .ok_or_else(|| {
                        AnalysisError::InvalidParameter(format!(
                            "date overflow {} days after {}",
                            i, start
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { observations })
    }

    /// Get the observations
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Get the dates as a vector
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    /// Get the AQI values as floating point numbers
    pub fn values(&self) -> Vec<f64> {
        self.observations
            .iter()
            .map(|o| f64::from(o.aqi_value))
            .collect()
    }

    /// First date, if any
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    /// Last date, if any
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Number of observations created by gap filling
    pub fn imputed_count(&self) -> usize {
        self.observations.iter().filter(|o| o.imputed).count()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Calculate the mean AQI
    pub fn mean(&self) -> Result<f64> {
        aqi_math::mean(&self.values()).ok_or(AnalysisError::InsufficientData { needed: 1, got: 0 })
    }

    /// Calculate the population standard deviation of the AQI
    pub fn std_dev(&self) -> Result<f64> {
        let values = self.values();
        let mean = self.mean()?;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        Ok(variance.sqrt())
    }
}
