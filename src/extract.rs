use crate::error::{DashboardError, Result};
use crate::structs::{RawRecord, RecordSet};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path, time::Instant};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header-named row of `day.csv` / `hour.csv`. Only `dteday`, `weathersit`
/// and `cnt` are required; other columns default to zero when absent.
#[derive(Debug, Deserialize)]
struct SourceRow {
    #[serde(default)]
    instant: u32,
    dteday: String,
    #[serde(default)]
    season: u8,
    #[serde(default)]
    yr: u8,
    #[serde(default)]
    mnth: u8,
    #[serde(default)]
    hr: Option<u8>,
    #[serde(default)]
    holiday: u8,
    #[serde(default)]
    weekday: u8,
    #[serde(default)]
    workingday: u8,
    weathersit: u8,
    #[serde(default)]
    temp: f64,
    #[serde(default)]
    atemp: f64,
    #[serde(default)]
    hum: f64,
    #[serde(default)]
    windspeed: f64,
    #[serde(default)]
    casual: u32,
    #[serde(default)]
    registered: u32,
    cnt: u32,
}

impl SourceRow {
    fn into_record(self, line: u64) -> Result<RawRecord> {
        Ok(RawRecord {
            instant: self.instant,
            date: parse_date(&self.dteday, line)?,
            season: self.season,
            year: self.yr,
            month: self.mnth,
            hour: self.hr,
            holiday: self.holiday,
            weekday: self.weekday,
            working_day: self.workingday,
            weather_situation: self.weathersit,
            temp: self.temp,
            atemp: self.atemp,
            humidity: self.hum,
            windspeed: self.windspeed,
            casual: self.casual,
            registered: self.registered,
            ride_count: self.cnt,
        })
    }
}

/// Loads a bike-sharing file from disk.
///
/// # Errors
///
/// Returns `DashboardError::Input` if the file cannot be opened, and any
/// error from [`read_records`] for its contents.
pub fn load_records(path: &Path) -> Result<RecordSet> {
    debug!("Reading CSV file: {}", path.display());
    let start = Instant::now();
    let file = File::open(path).map_err(|source| DashboardError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_records(file)?;
    debug!(
        "Loaded {} records from {} in {:.2?}",
        records.len(),
        path.display(),
        start.elapsed()
    );
    Ok(records)
}

/// Reads records from delimited text with a header row.
///
/// Rows are kept in input order. Extra columns are ignored.
///
/// # Errors
///
/// - `DashboardError::Parse` if a date is empty or not `YYYY-MM-DD[ HH:MM:SS]`
/// - `DashboardError::Csv` if a row is malformed or a numeric cell does not parse
pub fn read_records<R: Read>(reader: R) -> Result<RecordSet> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let row = result?;
        let line = row.position().map_or(0, |p| p.line());
        let source: SourceRow = row.deserialize(Some(&headers))?;
        records.push(source.into_record(line)?);
    }

    Ok(RecordSet::new(records))
}

/// Parses a calendar date, dropping any time-of-day component.
fn parse_date(raw: &str, line: u64) -> Result<NaiveDate> {
    if raw.is_empty() {
        return Err(DashboardError::Parse {
            line,
            message: "missing date".to_string(),
        });
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map(|dt| dt.date()))
        .map_err(|e| DashboardError::Parse {
            line,
            message: format!("invalid date {:?}: {}", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_HEADER: &str = "instant,dteday,season,yr,mnth,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_read_day_rows() {
        let data = format!(
            "{}\n1,2011-01-01,1,0,1,0,6,0,2,0.344167,0.363625,0.805833,0.160446,331,654,985\n2,2011-01-02,1,0,1,0,0,0,2,0.363478,0.353739,0.696087,0.248539,131,670,801\n",
            DAY_HEADER
        );
        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        let first = &records.records()[0];
        assert_eq!(first.instant, 1);
        assert_eq!(first.date, date(2011, 1, 1));
        assert_eq!(first.weather_situation, 2);
        assert_eq!(first.ride_count, 985);
        assert_eq!(first.casual + first.registered, first.ride_count);
        assert_eq!(first.hour, None);
        assert!((first.humidity - 0.805833).abs() < 1e-9);
        assert_eq!(records.records()[1].date, date(2011, 1, 2));
    }

    #[test]
    fn test_read_hour_rows() {
        let data = "instant,dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt\n\
                    1,2011-01-01,1,0,1,0,0,6,0,1,0.24,0.2879,0.81,0,3,13,16\n\
                    2,2011-01-01,1,0,1,1,0,6,0,1,0.22,0.2727,0.8,0,8,32,40\n";
        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records.records()[0].hour, Some(0));
        assert_eq!(records.records()[1].hour, Some(1));
        assert_eq!(records.records()[1].date, date(2011, 1, 1));
    }

    #[test]
    fn test_minimal_columns() {
        let data = "dteday,weathersit,cnt\n2021-01-01,1,10\n";
        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records.records()[0], RawRecord::new(date(2021, 1, 1), 10, 1));
    }

    #[test]
    fn test_datetime_keeps_calendar_date() {
        let data = "dteday,weathersit,cnt\n2021-03-04 17:30:00,3,4\n";
        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records.records()[0].date, date(2021, 3, 4));
    }

    #[test]
    fn test_malformed_date_names_line() {
        let data = "dteday,weathersit,cnt\n2021-01-01,1,10\n01/02/2021,1,3\n";
        let err = read_records(data.as_bytes()).unwrap_err();

        match err {
            DashboardError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("01/02/2021"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_date_fails() {
        let data = "dteday,weathersit,cnt\n,1,10\n";
        let err = read_records(data.as_bytes()).unwrap_err();

        assert!(matches!(err, DashboardError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_bad_count_fails() {
        let data = "dteday,weathersit,cnt\n2021-01-01,1,lots\n";

        assert!(matches!(
            read_records(data.as_bytes()),
            Err(DashboardError::Csv(_))
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let records = read_records(DAY_HEADER.as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = load_records(Path::new("definitely/not/here/day.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::Input { .. }));
    }
}
