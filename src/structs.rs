use crate::error::{DashboardError, Result};
use chrono::NaiveDate;
use log::{Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Simple logger implementation
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &LogRecord) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// One row of the bike-sharing dataset, daily or hourly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub instant: u32,
    pub date: NaiveDate,
    pub season: u8,
    pub year: u8,
    pub month: u8,
    /// Only present in the hourly file.
    pub hour: Option<u8>,
    pub holiday: u8,
    pub weekday: u8,
    pub working_day: u8,
    pub weather_situation: u8,
    pub temp: f64,
    pub atemp: f64,
    pub humidity: f64,
    pub windspeed: f64,
    pub casual: u32,
    pub registered: u32,
    pub ride_count: u32,
}

impl RawRecord {
    /// Builds a record carrying only the columns the aggregations read.
    /// Every other column is zero.
    pub fn new(date: NaiveDate, ride_count: u32, weather_situation: u8) -> Self {
        Self {
            instant: 0,
            date,
            season: 0,
            year: 0,
            month: 0,
            hour: None,
            holiday: 0,
            weekday: 0,
            working_day: 0,
            weather_situation,
            temp: 0.0,
            atemp: 0.0,
            humidity: 0.0,
            windspeed: 0.0,
            casual: 0,
            registered: 0,
            ride_count,
        }
    }
}

/// Records in file order. Dates may repeat (hourly data has 24 rows per day).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<RawRecord>,
}

impl RecordSet {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest date present, or `None` for an empty set.
    pub fn date_bounds(&self) -> Option<DateRange> {
        let start = self.records.iter().map(|r| r.date).min()?;
        let end = self.records.iter().map(|r| r.date).max()?;
        Some(DateRange { start, end })
    }
}

impl FromIterator<RawRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a RawRecord;
    type IntoIter = std::slice::Iter<'a, RawRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Inclusive date interval with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// # Errors
    /// Returns `DashboardError::InvalidRange` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Rides per calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub record_count: u32,
    pub total_rides: u64,
}

/// Rides per weather situation code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub weather_situation: u8,
    pub total_rides: u64,
}

/// Figures shown above the daily chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeadlineMetrics {
    pub total_rides: u64,
    /// Number of source rows, i.e. days for the daily file and hours for the hourly file.
    pub records: u64,
    pub distinct_days: usize,
}

/// Which source file the dashboard is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    #[default]
    Day,
    Hour,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Day => write!(f, "day"),
            Dataset::Hour => write!(f, "hour"),
        }
    }
}

/// Continuous columns, named as in the source header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NumericField {
    Temp,
    Atemp,
    Hum,
    Windspeed,
    Casual,
    Registered,
    Cnt,
}

impl NumericField {
    pub const ALL: [NumericField; 7] = [
        NumericField::Temp,
        NumericField::Atemp,
        NumericField::Hum,
        NumericField::Windspeed,
        NumericField::Casual,
        NumericField::Registered,
        NumericField::Cnt,
    ];

    pub fn column(self) -> &'static str {
        match self {
            NumericField::Temp => "temp",
            NumericField::Atemp => "atemp",
            NumericField::Hum => "hum",
            NumericField::Windspeed => "windspeed",
            NumericField::Casual => "casual",
            NumericField::Registered => "registered",
            NumericField::Cnt => "cnt",
        }
    }

    pub fn value(self, record: &RawRecord) -> f64 {
        match self {
            NumericField::Temp => record.temp,
            NumericField::Atemp => record.atemp,
            NumericField::Hum => record.humidity,
            NumericField::Windspeed => record.windspeed,
            NumericField::Casual => f64::from(record.casual),
            NumericField::Registered => f64::from(record.registered),
            NumericField::Cnt => f64::from(record.ride_count),
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Coded columns. Declared here rather than guessed from distinct-value counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalField {
    Season,
    Yr,
    Mnth,
    Hr,
    Holiday,
    Weekday,
    Workingday,
    Weathersit,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 8] = [
        CategoricalField::Season,
        CategoricalField::Yr,
        CategoricalField::Mnth,
        CategoricalField::Hr,
        CategoricalField::Holiday,
        CategoricalField::Weekday,
        CategoricalField::Workingday,
        CategoricalField::Weathersit,
    ];

    pub fn column(self) -> &'static str {
        match self {
            CategoricalField::Season => "season",
            CategoricalField::Yr => "yr",
            CategoricalField::Mnth => "mnth",
            CategoricalField::Hr => "hr",
            CategoricalField::Holiday => "holiday",
            CategoricalField::Weekday => "weekday",
            CategoricalField::Workingday => "workingday",
            CategoricalField::Weathersit => "weathersit",
        }
    }

    /// `None` when the record does not carry the column (`hr` in daily data).
    pub fn code(self, record: &RawRecord) -> Option<u8> {
        match self {
            CategoricalField::Season => Some(record.season),
            CategoricalField::Yr => Some(record.year),
            CategoricalField::Mnth => Some(record.month),
            CategoricalField::Hr => record.hour,
            CategoricalField::Holiday => Some(record.holiday),
            CategoricalField::Weekday => Some(record.weekday),
            CategoricalField::Workingday => Some(record.working_day),
            CategoricalField::Weathersit => Some(record.weather_situation),
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Summary statistics for one numeric column. Moments are `None` when undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub field: NumericField,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub percentile_25: Option<f64>,
    pub median: Option<f64>,
    pub percentile_75: Option<f64>,
    pub max: Option<f64>,
}

/// Pearson coefficients, `coefficients[i][j]` pairs `fields[i]` with `fields[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<NumericField>,
    pub coefficients: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: NumericField, b: NumericField) -> Option<f64> {
        let i = self.fields.iter().position(|&f| f == a)?;
        let j = self.fields.iter().position(|&f| f == b)?;
        self.coefficients[i][j]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub field: NumericField,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub code: u8,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub field: CategoricalField,
    pub counts: Vec<ValueCount>,
}

/// Configuration for the exploration tables of a view
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub histogram_bins: usize,
    pub numeric_fields: Vec<NumericField>,
    pub histogram_fields: Vec<NumericField>,
    pub categorical_fields: Vec<CategoricalField>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 10,
            numeric_fields: NumericField::ALL.to_vec(),
            histogram_fields: NumericField::ALL.to_vec(),
            categorical_fields: CategoricalField::ALL.to_vec(),
        }
    }
}
