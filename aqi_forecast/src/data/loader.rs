//! CSV loading with column normalization and row cleanup

use crate::data::series::Pollutant;
use crate::error::{AnalysisError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Literal used by the source data for a missing value
pub const MISSING_SENTINEL: &str = ".";

/// Columns every input file must provide, after normalization
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "date",
    "aqi_value",
    "main_pollutant",
    "site_name",
    "site_id",
    "source",
];

/// Loader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Field delimiter
    pub delimiter: char,
    /// Keep only rows from this monitoring site
    pub site_id: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            site_id: None,
        }
    }
}

/// Row schema after header normalization
#[derive(Debug, Deserialize)]
struct RawRecord {
    date: Option<String>,
    aqi_value: Option<String>,
    main_pollutant: Option<String>,
    site_name: Option<String>,
    site_id: Option<String>,
    source: Option<String>,
}

/// A cleaned row whose date has not been parsed yet
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecord {
    /// Date as written in the file
    pub date: String,
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
}

/// Reads AQI records from delimited text
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Create a loader
    pub fn new(config: LoaderConfig) -> Result<Self> {
        if !config.delimiter.is_ascii() {
            return Err(AnalysisError::InvalidParameter(format!(
                "delimiter must be an ASCII character, got '{}'",
                config.delimiter
            )));
        }
        Ok(Self { config })
    }

    /// Load records from a CSV file
    pub fn from_csv<P: AsRef<Path>>(&self, path: P) -> Result<Vec<LoadedRecord>> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading AQI records");
        let file = File::open(path)?;
        self.from_reader(file)
    }

    /// Load records from any reader producing delimited text
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Vec<LoadedRecord>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter as u8)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = normalize_headers(reader.headers()?)?;
        reader.set_headers(headers);

        let mut records = Vec::new();
        let mut rows_read = 0usize;
        let mut missing = 0usize;
        let mut invalid = 0usize;
        let mut other_site = 0usize;

        for row in reader.deserialize::<RawRecord>() {
            let raw = row?;
            rows_read += 1;

            let (date, aqi_raw) = match (present(raw.date), present(raw.aqi_value)) {
                (Some(date), Some(aqi)) => (date, aqi),
                _ => {
                    missing += 1;
                    continue;
                }
            };

            let aqi_value = match parse_aqi(&aqi_raw) {
                Some(value) => value,
                None => {
                    debug!(value = %aqi_raw, "dropping row with invalid AQI value");
                    invalid += 1;
                    continue;
                }
            };

            let site_id = present(raw.site_id);
            if let Some(wanted) = &self.config.site_id {
                if site_id.as_deref() != Some(wanted.as_str()) {
                    other_site += 1;
                    continue;
                }
            }

            records.push(LoadedRecord {
                date,
                aqi_value,
                main_pollutant: present(raw.main_pollutant).and_then(|p| p.parse().ok()),
                site_name: present(raw.site_name),
                site_id,
                source: present(raw.source).and_then(|s| s.parse().ok()),
            });
        }

        if missing > 0 || invalid > 0 {
            warn!(
                missing,
                invalid, "dropped rows with missing or invalid required fields"
            );
        }
        if other_site > 0 {
            debug!(other_site, "dropped rows from other sites");
        }
        info!(rows_read, kept = records.len(), "loaded AQI records");

        Ok(records)
    }
}

/// Normalize a column name to lower-case words joined by underscores.
///
/// `"Daily AQI Value"` becomes `"daily_aqi_value"`.
pub fn normalize_column_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    normalized
}

/// Map known alternative spellings onto the logical column names
fn canonical_column(normalized: &str) -> &str {
    match normalized {
        "daily_aqi_value" | "aqi" | "daily_aqi" => "aqi_value",
        "siteid" | "site_number" => "site_id",
        "defining_parameter" | "pollutant" => "main_pollutant",
        "local_site_name" | "site" => "site_name",
        "day" | "date_local" => "date",
        other => other,
    }
}

fn normalize_headers(headers: &StringRecord) -> Result<StringRecord> {
    let names: Vec<String> = headers
        .iter()
        .map(|h| canonical_column(&normalize_column_name(h)).to_string())
        .collect();

    let mut seen = HashSet::new();
    for name in REQUIRED_COLUMNS.iter() {
        let count = names.iter().filter(|n| n == name).count();
        if count > 1 {
            return Err(AnalysisError::DataFormat(format!(
                "column '{}' appears {} times after normalization",
                name, count
            )));
        }
        if count == 1 {
            seen.insert(*name);
        }
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !seen.contains(*c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::DataFormat(format!(
            "missing required column(s): {} (found: {})",
            missing.join(", "),
            names.join(", ")
        )));
    }

    Ok(StringRecord::from(names))
}

/// A field that is neither empty nor the missing-value sentinel
fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| {
        let value = value.trim();
        !value.is_empty() && value != MISSING_SENTINEL
    })
}

/// Parse a non-negative integer AQI, accepting integral decimals like "42.0"
fn parse_aqi(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u32>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Date", "date")]
    #[case("Daily AQI Value", "daily_aqi_value")]
    #[case("  Main Pollutant ", "main_pollutant")]
    #[case("Site ID", "site_id")]
    #[case("AQI-Value", "aqi_value")]
    #[case("__source__", "source")]
    fn test_normalize_column_name(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_column_name(raw), expected);
    }

    #[rstest]
    #[case("42", Some(42))]
    #[case("42.0", Some(42))]
    #[case("0", Some(0))]
    #[case("-3", None)]
    #[case("12.5", None)]
    #[case("high", None)]
    fn test_parse_aqi(#[case] raw: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_aqi(raw), expected);
    }

    #[test]
    fn test_loads_and_cleans_rows() {
        let csv = "\
Date,Daily AQI Value,Main Pollutant,Site Name,Site ID,Source
2023-01-01,45,Ozone,Central,06-001,1
2023-01-02,.,Ozone,Central,06-001,1
2023-01-03,,PM2.5,Central,06-001,1
,50,PM2.5,Central,06-001,1
2023-01-05,abc,PM2.5,Central,06-001,1
2023-01-06,61,PM2.5,.,06-001,x
";
        let records = Loader::default().from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "2023-01-01");
        assert_eq!(records[0].aqi_value, 45);
        assert_eq!(records[0].main_pollutant, Some(Pollutant::Ozone));
        assert_eq!(records[0].source, Some(1));
        assert_eq!(records[1].site_name, None);
        assert_eq!(records[1].source, None);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Date,Main Pollutant\n2023-01-01,Ozone\n";
        let result = Loader::default().from_reader(csv.as_bytes());
        match result {
            Err(AnalysisError::DataFormat(msg)) => assert!(msg.contains("aqi_value")),
            other => panic!("expected DataFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_metadata_columns_are_required() {
        let csv = "date,aqi_value\n2023-01-01,40\n2023-01-02,41\n";
        match Loader::default().from_reader(csv.as_bytes()) {
            Err(AnalysisError::DataFormat(msg)) => {
                assert!(msg.contains("main_pollutant, site_name, site_id, source"));
            }
            other => panic!("expected DataFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_metadata_values_are_kept() {
        let csv = "\
date,aqi_value,main_pollutant,site_name,site_id,source
2023-01-01,40,,,,
2023-01-02,41,.,.,.,.
";
        let records = Loader::default().from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.main_pollutant, None);
            assert_eq!(record.site_name, None);
            assert_eq!(record.site_id, None);
            assert_eq!(record.source, None);
        }
    }

    #[test]
    fn test_duplicate_column_after_normalization() {
        let csv = "date,AQI,Daily AQI Value\n2023-01-01,1,2\n";
        let result = Loader::default().from_reader(csv.as_bytes());
        assert!(matches!(result, Err(AnalysisError::DataFormat(_))));
    }

    #[test]
    fn test_site_filter_and_delimiter() {
        let csv = "\
date;aqi_value;main_pollutant;site_name;site_id;source
2023-01-01;10;Ozone;North;A;1
2023-01-01;20;Ozone;South;B;1
";
        let loader = Loader::new(LoaderConfig {
            delimiter: ';',
            site_id: Some("B".to_string()),
        })
        .unwrap();
        let records = loader.from_reader(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].aqi_value, 20);
    }

    #[test]
    fn test_rejects_non_ascii_delimiter() {
        let config = LoaderConfig {
            delimiter: '→',
            site_id: None,
        };
        assert!(matches!(
            Loader::new(config),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}
