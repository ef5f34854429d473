use crate::error::Result;
use crate::session::DashboardView;
use crate::structs::{DailySummary, DescriptiveStats, WeatherSummary};
use arrow_array::{Date32Array, RecordBatch, UInt8Array, UInt32Array, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use chrono::Datelike;
use csv::Writer;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A table row that knows its CSV header and cell formatting.
pub trait CsvRow {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

impl CsvRow for DailySummary {
    fn headers() -> &'static [&'static str] {
        &["Date", "Record_Count", "Total_Rides"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.record_count.to_string(),
            self.total_rides.to_string(),
        ]
    }
}

impl CsvRow for WeatherSummary {
    fn headers() -> &'static [&'static str] {
        &["Weather_Situation", "Total_Rides"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.weather_situation.to_string(),
            self.total_rides.to_string(),
        ]
    }
}

impl CsvRow for DescriptiveStats {
    fn headers() -> &'static [&'static str] {
        &[
            "Field",
            "Count",
            "Mean",
            "Std",
            "Min",
            "Percentile_25",
            "Median",
            "Percentile_75",
            "Max",
        ]
    }

    fn cells(&self) -> Vec<String> {
        let fmt = |v: Option<f64>| v.map(|x| format!("{:.4}", x)).unwrap_or_default();
        vec![
            self.field.to_string(),
            self.count.to_string(),
            fmt(self.mean),
            fmt(self.std),
            fmt(self.min),
            fmt(self.percentile_25),
            fmt(self.median),
            fmt(self.percentile_75),
            fmt(self.max),
        ]
    }
}

/// Writes rows to a CSV file with a header line.
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_csv<T: CsvRow>(rows: &[T], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(T::headers())?;
    for row in rows {
        writer.write_record(row.cells())?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes any serializable value as pretty-formatted JSON.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Converts daily summaries into an Arrow batch (`date` is `Date32`).
///
/// # Errors
/// Returns error if the columns do not match the schema.
pub fn daily_batch(daily: &[DailySummary]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("record_count", DataType::UInt32, false),
        Field::new("total_rides", DataType::UInt64, false),
    ]));

    let dates = Date32Array::from_iter_values(
        daily
            .iter()
            .map(|d| d.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
    );
    let counts: UInt32Array = daily.iter().map(|d| d.record_count).collect();
    let totals: UInt64Array = daily.iter().map(|d| d.total_rides).collect();

    Ok(RecordBatch::try_new(
        schema,
        vec![Arc::new(dates), Arc::new(counts), Arc::new(totals)],
    )?)
}

/// Converts weather summaries into an Arrow batch.
///
/// # Errors
/// Returns error if the columns do not match the schema.
pub fn weather_batch(weather: &[WeatherSummary]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("weather_situation", DataType::UInt8, false),
        Field::new("total_rides", DataType::UInt64, false),
    ]));

    let codes: UInt8Array = weather.iter().map(|w| w.weather_situation).collect();
    let totals: UInt64Array = weather.iter().map(|w| w.total_rides).collect();

    Ok(RecordBatch::try_new(
        schema,
        vec![Arc::new(codes), Arc::new(totals)],
    )?)
}

/// Writes one record batch to a Parquet file.
///
/// # Errors
/// Returns error if file cannot be created or Arrow/Parquet encoding fails.
pub fn write_parquet(batch: &RecordBatch, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Writes every table of `view` into `dir`, returning the paths written.
///
/// # Errors
/// Returns the first write failure.
pub fn write_view(view: &DashboardView, dir: &Path) -> Result<Vec<PathBuf>> {
    let path = |name: &str| dir.join(name);
    let mut written = Vec::new();

    write_csv(&view.daily, &path("daily.csv"))?;
    write_json(&view.daily, &path("daily.json"))?;
    write_parquet(&daily_batch(&view.daily)?, &path("daily.parquet"))?;
    written.extend(["daily.csv", "daily.json", "daily.parquet"].map(path));

    write_csv(&view.weather, &path("weather.csv"))?;
    write_json(&view.weather, &path("weather.json"))?;
    write_parquet(&weather_batch(&view.weather)?, &path("weather.parquet"))?;
    written.extend(["weather.csv", "weather.json", "weather.parquet"].map(path));

    write_csv(&view.describe, &path("describe.csv"))?;
    write_json(&view.describe, &path("describe.json"))?;
    write_json(&view.correlations, &path("correlations.json"))?;
    write_json(&view.histograms, &path("histograms.json"))?;
    write_json(&view.category_counts, &path("category_counts.json"))?;
    written.extend(
        [
            "describe.csv",
            "describe.json",
            "correlations.json",
            "histograms.json",
            "category_counts.json",
        ]
        .map(path),
    );

    debug!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
