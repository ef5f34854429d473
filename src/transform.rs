use crate::error::Result;
use crate::structs::{DailySummary, DateRange, HeadlineMetrics, RecordSet, WeatherSummary};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Keeps the records dated within `start..=end`, preserving their order.
///
/// Surviving records are cloned into a new set; the input is left untouched.
///
/// # Errors
///
/// Returns `DashboardError::InvalidRange` if `start` is after `end`.
pub fn filter_by_date_range(
    records: &RecordSet,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RecordSet> {
    let range = DateRange::new(start, end)?;
    let filtered: RecordSet = records
        .iter()
        .filter(|r| range.contains(r.date))
        .cloned()
        .collect();
    debug!(
        "Filtered {} of {} records to {}",
        filtered.len(),
        records.len(),
        range
    );
    Ok(filtered)
}

/// Groups records by calendar date.
///
/// Returns one row per date present, ascending. Dates with no records are
/// not filled in.
pub fn daily_summary(records: &RecordSet) -> Vec<DailySummary> {
    let mut buckets: BTreeMap<NaiveDate, (u32, u64)> = BTreeMap::new();
    for record in records {
        let (count, total) = buckets.entry(record.date).or_default();
        *count += 1;
        *total += u64::from(record.ride_count);
    }

    buckets
        .into_iter()
        .map(|(date, (record_count, total_rides))| DailySummary {
            date,
            record_count,
            total_rides,
        })
        .collect()
}

/// Groups records by weather situation code, ascending.
pub fn weather_summary(records: &RecordSet) -> Vec<WeatherSummary> {
    let mut buckets: BTreeMap<u8, u64> = BTreeMap::new();
    for record in records {
        *buckets.entry(record.weather_situation).or_default() += u64::from(record.ride_count);
    }

    buckets
        .into_iter()
        .map(|(weather_situation, total_rides)| WeatherSummary {
            weather_situation,
            total_rides,
        })
        .collect()
}

pub fn headline_metrics(daily: &[DailySummary]) -> HeadlineMetrics {
    HeadlineMetrics {
        total_rides: daily.iter().map(|d| d.total_rides).sum(),
        records: daily.iter().map(|d| u64::from(d.record_count)).sum(),
        distinct_days: daily.len(),
    }
}
