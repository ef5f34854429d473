use crate::error::{DashboardError, Result};
use crate::structs::{
    CategoricalField, CategoryCounts, CorrelationMatrix, DescriptiveStats, Histogram,
    HistogramBin, NumericField, RecordSet, ValueCount,
};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Computes summary statistics for each requested column.
///
/// Rows come back in the order of `fields`.
///
/// # Statistical Methods
///
/// - **Standard Deviation**: Sample standard deviation (N-1 denominator), `None` below two values
/// - **Percentiles**: Linear interpolation between closest ranks
pub fn describe(records: &RecordSet, fields: &[NumericField]) -> Vec<DescriptiveStats> {
    fields
        .par_iter()
        .map(|&field| describe_values(field, &column(records, field)))
        .collect()
}

/// Pearson correlation between every pair of `fields`.
///
/// Entries are `None` when either column has zero variance or fewer than two
/// values are present.
pub fn correlation_matrix(records: &RecordSet, fields: &[NumericField]) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = fields.iter().map(|&f| column(records, f)).collect();
    let n = fields.len();

    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();
    let values: Vec<((usize, usize), Option<f64>)> = pairs
        .into_par_iter()
        .map(|(i, j)| ((i, j), pearson(&columns[i], &columns[j])))
        .collect();

    let mut coefficients = vec![vec![None; n]; n];
    for ((i, j), value) in values {
        coefficients[i][j] = value;
        coefficients[j][i] = value;
    }

    CorrelationMatrix {
        fields: fields.to_vec(),
        coefficients,
    }
}

/// Splits a column into `bins` equal-width bins.
///
/// Every bin is half-open except the last, which also holds the maximum.
/// A constant column is spread over `[v - 0.5, v + 0.5]`. An empty set gives
/// no bins.
///
/// # Errors
///
/// Returns `DashboardError::Data` if `bins` is zero.
pub fn histogram(records: &RecordSet, field: NumericField, bins: usize) -> Result<Histogram> {
    if bins == 0 {
        return Err(DashboardError::Data(format!(
            "Histogram for {} needs at least one bin",
            field
        )));
    }

    let values = column(records, field);
    if values.is_empty() {
        return Ok(Histogram {
            field,
            bins: Vec::new(),
        });
    }

    let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let (lower, upper) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (upper - lower) / bins as f64;

    let mut counts = vec![0u32; bins];
    for v in &values {
        let index = (((v - lower) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lower + i as f64 * width,
            upper: if i + 1 == bins {
                upper
            } else {
                lower + (i + 1) as f64 * width
            },
            count,
        })
        .collect();

    Ok(Histogram { field, bins })
}

/// Counts records per code of a categorical column, ascending by code.
///
/// Records that do not carry the column are skipped.
pub fn value_counts(records: &RecordSet, field: CategoricalField) -> CategoryCounts {
    let mut buckets: BTreeMap<u8, u32> = BTreeMap::new();
    for code in records.iter().filter_map(|r| field.code(r)) {
        *buckets.entry(code).or_default() += 1;
    }

    CategoryCounts {
        field,
        counts: buckets
            .into_iter()
            .map(|(code, count)| ValueCount { code, count })
            .collect(),
    }
}

fn column(records: &RecordSet, field: NumericField) -> Vec<f64> {
    records.iter().map(|r| field.value(r)).collect()
}

fn describe_values(field: NumericField, values: &[f64]) -> DescriptiveStats {
    let count = values.len();
    if count == 0 {
        return DescriptiveStats {
            field,
            count,
            mean: None,
            std: None,
            min: None,
            percentile_25: None,
            median: None,
            percentile_75: None,
            max: None,
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = sorted.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let variance =
            sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    });

    DescriptiveStats {
        field,
        count,
        mean: Some(mean),
        std,
        min: sorted.first().copied(),
        percentile_25: Some(percentile(&sorted, 25.0)),
        median: Some(percentile(&sorted, 50.0)),
        percentile_75: Some(percentile(&sorted, 75.0)),
        max: sorted.last().copied(),
    }
}

/// Linear-interpolated percentile of an already sorted, non-empty slice.
fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    let index = (percentile / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
