use clap::Parser;
use chrono::NaiveDate;
use lib::{
    DashboardConfig, DashboardError, DashboardView, Dataset, Datasets, Event, NumericField,
    Session, SimpleLogger, load_records, parse_command, write_view,
};
use log::{debug, warn};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Daily bike-sharing CSV file
    #[arg(long, default_value = "day.csv")]
    day_file: PathBuf,

    /// Hourly bike-sharing CSV file (optional)
    #[arg(long)]
    hour_file: Option<PathBuf>,

    /// Dataset to show first
    #[arg(long, default_value = "day")]
    dataset: Dataset,

    /// Start date (inclusive, YYYY-MM-DD). Defaults to the first date in the dataset.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (inclusive, YYYY-MM-DD). Defaults to the last date in the dataset.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Number of histogram bins
    #[arg(long, default_value_t = 10)]
    bins: usize,

    /// Columns to build histograms for (e.g., temp,cnt). If not specified, uses every numeric column.
    #[arg(long, value_delimiter = ',')]
    histogram: Vec<NumericField>,

    /// Output directory name (created under ./output)
    #[arg(short, long, default_value = "dashboard")]
    output: String,

    /// Read commands (range, dataset, reset, quit) from stdin after the first view
    #[arg(long, default_value_t = false)]
    interactive: bool,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,
}

fn main() -> Result<(), DashboardError> {
    let total_start = Instant::now();
    log::set_logger(&LOGGER)?;

    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    println!("Bike Sharing Dashboard");
    debug!(
        "Day file: {} | Hour file: {:?} | Dataset: {}",
        args.day_file.display(),
        args.hour_file,
        args.dataset
    );

    // Datasets are loaded once and shared by every view
    let load_start = Instant::now();
    let day = Arc::new(load_records(&args.day_file)?);
    let hour = args
        .hour_file
        .as_deref()
        .map(load_records)
        .transpose()?
        .map(Arc::new);
    println!(
        "Loaded {} daily{} records in {:.2?}",
        day.len(),
        hour.as_ref()
            .map(|h| format!(" and {} hourly", h.len()))
            .unwrap_or_default(),
        load_start.elapsed()
    );
    let datasets = Arc::new(Datasets { day, hour });

    let config = DashboardConfig {
        histogram_bins: args.bins,
        histogram_fields: if args.histogram.is_empty() {
            NumericField::ALL.to_vec()
        } else {
            args.histogram.clone()
        },
        ..DashboardConfig::default()
    };
    debug!(
        "Histogram bins: {} | Histogram fields: {:?}",
        config.histogram_bins, config.histogram_fields
    );

    let mut session = Session::new(datasets, config)?;
    if args.dataset != Dataset::Day {
        session.dispatch(Event::DatasetSelected(args.dataset))?;
    }
    if args.start.is_some() || args.end.is_some() {
        match session.bounds() {
            Some(bounds) => {
                session.dispatch(Event::DateRangeChanged {
                    start: args.start.unwrap_or(bounds.start()),
                    end: args.end.unwrap_or(bounds.end()),
                })?;
            }
            None => warn!("Dataset {} is empty; ignoring date range", session.dataset()),
        }
    }

    let output_dir = PathBuf::from(format!("./output/{}", args.output));
    fs::create_dir_all(&output_dir)?;
    render(session.view(), &output_dir)?;

    if args.interactive {
        println!("\nCommands: range <start> <end> | dataset day|hour | reset | quit");
        for line in io::stdin().lock().lines() {
            let line = line?;
            if matches!(line.trim(), "quit" | "exit") {
                break;
            }
            match parse_command(&line) {
                Ok(Some(event)) => {
                    let view = session.dispatch(event)?;
                    render(view, &output_dir)?;
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
    }

    println!("\nTotal runtime: {:.2?}", total_start.elapsed());
    Ok(())
}

/// Prints the headline figures of a view and refreshes its output files.
fn render(view: &DashboardView, output_dir: &Path) -> Result<(), DashboardError> {
    println!();
    if let Some(notice) = &view.notice {
        println!("Notice: {}", notice);
    }
    match view.range {
        Some(range) => println!("Dataset: {} | Range: {}", view.dataset, range),
        None => println!("Dataset: {} | Range: (none)", view.dataset),
    }
    println!(
        "Total Rides: {} | Records: {} | Days: {}",
        view.metrics.total_rides, view.metrics.records, view.metrics.distinct_days
    );
    for w in &view.weather {
        println!(
            "  Weather {}: {} rides",
            w.weather_situation, w.total_rides
        );
    }

    let io_start = Instant::now();
    let written = write_view(view, output_dir)?;
    println!(
        "Wrote {} files to {} in {:.2?}",
        written.len(),
        output_dir.display(),
        io_start.elapsed()
    );
    for path in &written {
        debug!("  - {}", path.display());
    }
    Ok(())
}
