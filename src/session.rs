//! Interactive state: one dashboard session driven by explicit events.
//!
//! Raw datasets are loaded once and shared read-only through [`Arc`]. Each
//! [`Session`] owns its current selection and rebuilds its whole
//! [`DashboardView`] from the filtered records on every event.

use crate::error::{DashboardError, Result};
use crate::stats::{correlation_matrix, describe, histogram, value_counts};
use crate::structs::{
    CategoryCounts, CorrelationMatrix, DailySummary, DashboardConfig, Dataset, DateRange,
    DescriptiveStats, HeadlineMetrics, Histogram, RecordSet, WeatherSummary,
};
use crate::transform::{daily_summary, filter_by_date_range, headline_metrics, weather_summary};
use chrono::NaiveDate;
use clap::ValueEnum;
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// The loaded source files.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub day: Arc<RecordSet>,
    pub hour: Option<Arc<RecordSet>>,
}

impl Datasets {
    pub fn get(&self, dataset: Dataset) -> Option<&Arc<RecordSet>> {
        match dataset {
            Dataset::Day => Some(&self.day),
            Dataset::Hour => self.hour.as_ref(),
        }
    }
}

/// A user interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    DateRangeChanged { start: NaiveDate, end: NaiveDate },
    DatasetSelected(Dataset),
    /// Back to the full date span of the current dataset.
    Reset,
}

/// Everything the presentation layer draws for the current selection.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub dataset: Dataset,
    pub range: Option<DateRange>,
    pub filtered_records: usize,
    pub daily: Vec<DailySummary>,
    pub weather: Vec<WeatherSummary>,
    pub metrics: HeadlineMetrics,
    pub describe: Vec<DescriptiveStats>,
    pub correlations: CorrelationMatrix,
    pub histograms: Vec<Histogram>,
    pub category_counts: Vec<CategoryCounts>,
    /// Set when the last event could not be applied as asked.
    pub notice: Option<String>,
}

pub struct Session {
    datasets: Arc<Datasets>,
    config: DashboardConfig,
    dataset: Dataset,
    requested: Option<(NaiveDate, NaiveDate)>,
    view: DashboardView,
}

impl Session {
    /// Opens a session on the daily dataset over its full date span.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Data` if the configuration asks for zero histogram bins.
    pub fn new(datasets: Arc<Datasets>, config: DashboardConfig) -> Result<Self> {
        if config.histogram_bins == 0 {
            return Err(DashboardError::Data(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        let requested = datasets.day.date_bounds().map(|r| (r.start(), r.end()));
        let view = build_view(Dataset::Day, None, &RecordSet::default(), &config, None)?;
        let mut session = Self {
            datasets,
            config,
            dataset: Dataset::Day,
            requested,
            view,
        };
        session.refresh(None)?;
        Ok(session)
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Full date span of the current dataset.
    pub fn bounds(&self) -> Option<DateRange> {
        self.records().date_bounds()
    }

    /// Applies `event` and recomputes the view.
    ///
    /// An inverted date range does not fail: the view is emptied and carries a
    /// notice. Selecting the hourly dataset when none was loaded keeps the
    /// current dataset, also with a notice.
    pub fn dispatch(&mut self, event: Event) -> Result<&DashboardView> {
        debug!("Dispatching {:?}", event);
        let notice = match event {
            Event::DateRangeChanged { start, end } => {
                self.requested = Some((start, end));
                None
            }
            Event::DatasetSelected(dataset) if self.datasets.get(dataset).is_none() => {
                warn!("Dataset {} was not loaded; staying on {}", dataset, self.dataset);
                Some(format!("dataset {} is not loaded", dataset))
            }
            Event::DatasetSelected(dataset) => {
                self.dataset = dataset;
                if self.requested.is_none() {
                    self.requested = self.bounds().map(|r| (r.start(), r.end()));
                }
                None
            }
            Event::Reset => {
                self.requested = self.bounds().map(|r| (r.start(), r.end()));
                None
            }
        };
        self.refresh(notice)?;
        Ok(&self.view)
    }

    fn records(&self) -> &RecordSet {
        self.datasets
            .get(self.dataset)
            .map_or(&self.datasets.day, |r| r)
    }

    fn refresh(&mut self, notice: Option<String>) -> Result<()> {
        let started = Instant::now();
        let records = self.records();

        let (filtered, range, notice) = match self.requested {
            None => (RecordSet::default(), None, notice),
            Some((start, end)) => match DateRange::new(start, end) {
                Ok(range) => (
                    filter_by_date_range(records, range.start(), range.end())?,
                    Some(range),
                    notice,
                ),
                Err(err) => {
                    warn!("{}; showing an empty view", err);
                    (RecordSet::default(), None, Some(err.to_string()))
                }
            },
        };

        let view = build_view(self.dataset, range, &filtered, &self.config, notice)?;
        debug!(
            "Rebuilt {} view from {} records in {:.2?}",
            self.dataset,
            filtered.len(),
            started.elapsed()
        );
        self.view = view;
        Ok(())
    }
}

/// Computes every table of a view from an already filtered record set.
///
/// # Errors
///
/// Returns `DashboardError::Data` if `config.histogram_bins` is zero.
pub fn build_view(
    dataset: Dataset,
    range: Option<DateRange>,
    filtered: &RecordSet,
    config: &DashboardConfig,
    notice: Option<String>,
) -> Result<DashboardView> {
    let daily = daily_summary(filtered);
    let weather = weather_summary(filtered);
    let metrics = headline_metrics(&daily);
    let histograms = config
        .histogram_fields
        .iter()
        .map(|&field| histogram(filtered, field, config.histogram_bins))
        .collect::<Result<Vec<_>>>()?;

    Ok(DashboardView {
        dataset,
        range,
        filtered_records: filtered.len(),
        daily,
        weather,
        metrics,
        describe: describe(filtered, &config.numeric_fields),
        correlations: correlation_matrix(filtered, &config.numeric_fields),
        histograms,
        category_counts: config
            .categorical_fields
            .iter()
            .map(|&field| value_counts(filtered, field))
            .collect(),
        notice,
    })
}

/// Parses one line of interactive input.
///
/// Accepted forms are `range <YYYY-MM-DD> <YYYY-MM-DD>`, `dataset day|hour`
/// and `reset`. Blank lines and `#` comments give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let event = match parts.as_slice() {
        ["range", start, end] => Event::DateRangeChanged {
            start: parse_day(start)?,
            end: parse_day(end)?,
        },
        ["dataset", name] => Event::DatasetSelected(
            Dataset::from_str(name, true).map_err(DashboardError::Command)?,
        ),
        ["reset"] => Event::Reset,
        _ => return Err(DashboardError::Command(format!("unknown command: {}", line))),
    };
    Ok(Some(event))
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    raw.parse()
        .map_err(|e| DashboardError::Command(format!("invalid date {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::RawRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn datasets(with_hours: bool) -> Arc<Datasets> {
        let day = RecordSet::new(vec![
            RawRecord::new(date(2021, 1, 1), 10, 1),
            RawRecord::new(date(2021, 1, 1), 5, 2),
            RawRecord::new(date(2021, 1, 2), 7, 1),
        ]);
        let hour = with_hours.then(|| {
            (0..24u8)
                .map(|h| {
                    let mut r = RawRecord::new(date(2021, 1, 3), u32::from(h), 1 + h % 3);
                    r.hour = Some(h);
                    r
                })
                .collect::<RecordSet>()
        });
        Arc::new(Datasets {
            day: Arc::new(day),
            hour: hour.map(Arc::new),
        })
    }

    #[test]
    fn test_new_session_covers_full_span() {
        let session = Session::new(datasets(false), DashboardConfig::default()).unwrap();
        let view = session.view();

        assert_eq!(view.dataset, Dataset::Day);
        assert_eq!(view.range, Some(DateRange::new(date(2021, 1, 1), date(2021, 1, 2)).unwrap()));
        assert_eq!(view.metrics.total_rides, 22);
        assert_eq!(view.daily.len(), 2);
        assert_eq!(view.weather.len(), 2);
        assert_eq!(view.histograms.len(), 7);
        assert_eq!(view.category_counts.len(), 8);
        assert!(view.notice.is_none());
    }

    #[test]
    fn test_range_change_recomputes() {
        let mut session = Session::new(datasets(false), DashboardConfig::default()).unwrap();
        let view = session
            .dispatch(Event::DateRangeChanged {
                start: date(2021, 1, 2),
                end: date(2021, 1, 2),
            })
            .unwrap();

        assert_eq!(view.filtered_records, 1);
        assert_eq!(
            view.daily,
            vec![DailySummary {
                date: date(2021, 1, 2),
                record_count: 1,
                total_rides: 7
            }]
        );
        assert_eq!(view.metrics.total_rides, 7);
    }

    #[test]
    fn test_inverted_range_gives_empty_view() {
        let mut session = Session::new(datasets(false), DashboardConfig::default()).unwrap();
        let view = session
            .dispatch(Event::DateRangeChanged {
                start: date(2021, 1, 2),
                end: date(2021, 1, 1),
            })
            .unwrap();

        assert_eq!(view.filtered_records, 0);
        assert!(view.daily.is_empty());
        assert!(view.weather.is_empty());
        assert!(view.range.is_none());
        assert!(view.notice.as_deref().unwrap().contains("after"));

        let view = session.dispatch(Event::Reset).unwrap();
        assert_eq!(view.filtered_records, 3);
        assert!(view.notice.is_none());
    }

    #[test]
    fn test_switch_to_hourly() {
        let mut session = Session::new(datasets(true), DashboardConfig::default()).unwrap();
        session.dispatch(Event::DatasetSelected(Dataset::Hour)).unwrap();
        assert_eq!(session.view().filtered_records, 0);

        let view = session.dispatch(Event::Reset).unwrap();
        assert_eq!(view.dataset, Dataset::Hour);
        assert_eq!(view.filtered_records, 24);
        assert_eq!(view.daily.len(), 1);
        assert_eq!(view.daily[0].record_count, 24);
        assert_eq!(view.metrics.total_rides, (0..24).sum::<u64>());
        let hours = view
            .category_counts
            .iter()
            .find(|c| c.field == crate::structs::CategoricalField::Hr)
            .unwrap();
        assert_eq!(hours.counts.len(), 24);
    }

    #[test]
    fn test_missing_hourly_keeps_dataset() {
        let mut session = Session::new(datasets(false), DashboardConfig::default()).unwrap();
        let view = session.dispatch(Event::DatasetSelected(Dataset::Hour)).unwrap();

        assert_eq!(view.dataset, Dataset::Day);
        assert_eq!(view.filtered_records, 3);
        assert!(view.notice.is_some());
        assert_eq!(session.dataset(), Dataset::Day);
    }

    #[test]
    fn test_sessions_share_raw_data() {
        let shared = datasets(false);
        let mut a = Session::new(Arc::clone(&shared), DashboardConfig::default()).unwrap();
        let b = Session::new(Arc::clone(&shared), DashboardConfig::default()).unwrap();

        a.dispatch(Event::DateRangeChanged {
            start: date(2021, 1, 1),
            end: date(2021, 1, 1),
        })
        .unwrap();

        assert_eq!(a.view().filtered_records, 2);
        assert_eq!(b.view().filtered_records, 3);
        assert_eq!(shared.day.len(), 3);
    }

    #[test]
    fn test_zero_bins_rejected() {
        let config = DashboardConfig {
            histogram_bins: 0,
            ..DashboardConfig::default()
        };
        assert!(matches!(
            Session::new(datasets(false), config),
            Err(DashboardError::Data(_))
        ));
    }

    #[test]
    fn test_empty_day_file() {
        let empty = Arc::new(Datasets {
            day: Arc::new(RecordSet::default()),
            hour: None,
        });
        let session = Session::new(empty, DashboardConfig::default()).unwrap();
        assert!(session.view().range.is_none());
        assert!(session.view().daily.is_empty());
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("range 2011-01-01 2011-01-31").unwrap(),
            Some(Event::DateRangeChanged {
                start: date(2011, 1, 1),
                end: date(2011, 1, 31)
            })
        );
        assert_eq!(
            parse_command("  dataset HOUR ").unwrap(),
            Some(Event::DatasetSelected(Dataset::Hour))
        );
        assert_eq!(parse_command("reset").unwrap(), Some(Event::Reset));
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("# comment").unwrap(), None);

        assert!(matches!(parse_command("range 2011-13-01 2011-01-31"), Err(DashboardError::Command(_))));
        assert!(matches!(parse_command("dataset week"), Err(DashboardError::Command(_))));
        assert!(matches!(parse_command("zoom in"), Err(DashboardError::Command(_))));
    }
}
