pub mod error;
pub mod extract;
pub mod load;
pub mod session;
pub mod stats;
pub mod structs;
pub mod transform;

// Re-export public API
pub use error::{DashboardError, Result};
pub use extract::{load_records, read_records};
pub use load::{CsvRow, daily_batch, weather_batch, write_csv, write_json, write_parquet, write_view};
pub use session::{DashboardView, Datasets, Event, Session, build_view, parse_command};
pub use stats::{correlation_matrix, describe, histogram, value_counts};
pub use structs::{
    CategoricalField, CategoryCounts, CorrelationMatrix, DailySummary, DashboardConfig, Dataset,
    DateRange, DescriptiveStats, HeadlineMetrics, Histogram, HistogramBin, NumericField,
    RawRecord, RecordSet, SimpleLogger, ValueCount, WeatherSummary,
};
pub use transform::{daily_summary, filter_by_date_range, headline_metrics, weather_summary};
