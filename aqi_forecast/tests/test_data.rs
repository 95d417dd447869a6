use aqi_forecast::data::{
    AqiSeries, DuplicatePolicy, GapPolicy, Indexer, IndexerConfig, Loader, LoaderConfig, Pollutant,
};
use aqi_forecast::AnalysisError;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily rows of `date,aqi` pairs from one site, with the standard header
fn site_csv(rows: &[&str]) -> String {
    let mut contents = String::from("date,aqi_value,main_pollutant,site_name,site_id,source\n");
    for row in rows {
        contents.push_str(row);
        contents.push_str(",Ozone,Central,06-001,1\n");
    }
    contents
}

fn load_and_index(contents: &str, indexer: &Indexer) -> Result<AqiSeries, AnalysisError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    let records = Loader::default().from_csv(file.path())?;
    indexer.index(records)
}

#[test]
fn test_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Daily AQI Value,Main Pollutant,Site Name,Site ID,Source").unwrap();
    writeln!(file, "2023-01-01,45,Ozone,Central,06-001,1").unwrap();
    writeln!(file, "2023-01-02,52,PM2.5,Central,06-001,1").unwrap();
    writeln!(file, "2023-01-03,48,PM10,Central,06-001,1").unwrap();

    let records = Loader::default().from_csv(file.path()).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[1].aqi_value, 52);
    assert_eq!(records[1].main_pollutant, Some(Pollutant::Pm25));
    assert_eq!(records[2].site_id.as_deref(), Some("06-001"));
}

#[test]
fn test_unsorted_file_is_indexed_in_order() {
    let series = load_and_index(
        &site_csv(&["01/03/2023,30", "01/01/2023,10", "01/02/2023,20"]),
        &Indexer::default(),
    )
    .unwrap();

    assert_eq!(
        series.dates(),
        vec![day(2023, 1, 1), day(2023, 1, 2), day(2023, 1, 3)]
    );
    assert!(series.dates().windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_sentinels_and_gaps() {
    // The "." row is dropped, leaving a one-day gap that is forward filled
    let series = load_and_index(
        "Date,AQI,Defining Parameter,Site Name,Site ID,Source\n\
         2023-03-01,40,Ozone,Central,06-001,1\n\
         2023-03-02,.,Ozone,Central,06-001,1\n\
         2023-03-03,44,Ozone,Central,06-001,1\n",
        &Indexer::default(),
    )
    .unwrap();

    assert_eq!(series.values(), vec![40.0, 40.0, 44.0]);
    assert_eq!(series.imputed_count(), 1);
    assert!(series
        .dates()
        .windows(2)
        .all(|w| (w[1] - w[0]).num_days() == 1));
}

#[test]
fn test_gap_reject_policy() {
    let indexer = Indexer::new(IndexerConfig {
        gaps: GapPolicy::Reject,
        ..IndexerConfig::default()
    })
    .unwrap();
    let result = load_and_index(&site_csv(&["2023-03-01,40", "2023-03-05,44"]), &indexer);

    assert!(matches!(
        result,
        Err(AnalysisError::GapDetected { missing_days: 3, .. })
    ));
}

#[test]
fn test_duplicate_dates() {
    let contents = site_csv(&["2023-03-01,40", "2023-03-01,45", "2023-03-02,50"]);

    assert!(matches!(
        load_and_index(&contents, &Indexer::default()),
        Err(AnalysisError::DuplicateDate(_))
    ));

    let averaging = Indexer::new(IndexerConfig {
        duplicates: DuplicatePolicy::Mean,
        ..IndexerConfig::default()
    })
    .unwrap();
    let series = load_and_index(&contents, &averaging).unwrap();
    assert_eq!(series.values(), vec![43.0, 50.0]);
}

#[test]
fn test_unparseable_date_names_value() {
    match load_and_index(&site_csv(&["March 1st,40"]), &Indexer::default()) {
        Err(AnalysisError::Parse(msg)) => assert!(msg.contains("March 1st")),
        other => panic!("expected Parse error, got {:?}", other),
    }
}

#[test]
fn test_loader_error_handling() {
    assert!(matches!(
        Loader::default().from_csv("nonexistent_file.csv"),
        Err(AnalysisError::Io(_))
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "invalid,csv,format").unwrap();
    assert!(matches!(
        Loader::default().from_csv(file.path()),
        Err(AnalysisError::DataFormat(_))
    ));
}

#[test]
fn test_missing_metadata_columns() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,aqi_value").unwrap();
    writeln!(file, "2023-01-01,10").unwrap();
    writeln!(file, "2023-01-02,12").unwrap();

    match Loader::default().from_csv(file.path()) {
        Err(AnalysisError::DataFormat(msg)) => {
            for column in ["main_pollutant", "site_name", "site_id", "source"] {
                assert!(msg.contains(column), "{} not named in {}", column, msg);
            }
        }
        other => panic!("expected DataFormat error, got {:?}", other),
    }
}

#[test]
fn test_site_filter() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,aqi_value,main_pollutant,site_name,site_id,source").unwrap();
    writeln!(file, "2023-01-01,10,Ozone,North,A,1").unwrap();
    writeln!(file, "2023-01-01,90,Ozone,South,B,1").unwrap();
    writeln!(file, "2023-01-02,12,Ozone,North,A,1").unwrap();

    let loader = Loader::new(LoaderConfig {
        site_id: Some("A".to_string()),
        ..LoaderConfig::default()
    })
    .unwrap();
    let series = Indexer::default()
        .index(loader.from_csv(file.path()).unwrap())
        .unwrap();

    assert_eq!(series.values(), vec![10.0, 12.0]);
}
