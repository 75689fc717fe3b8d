//! Dataset profiling: shape, null counts, duplicates and numeric summaries.

use std::collections::HashSet;

use crime_trends_analytics_models::{ColumnProfile, NumericSummary, TableProfile};
use crime_trends_source::clean::count_duplicates;
use crime_trends_source::parsing::parse_cell;
use crime_trends_source_models::Table;

/// Profiles every column of `table` and counts duplicate rows.
#[must_use]
pub fn profile_table(table: &Table) -> TableProfile {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let mut null_count = 0;
            let mut distinct: HashSet<&str> = HashSet::new();
            for value in table.column_values(idx) {
                match value {
                    Some(v) => {
                        distinct.insert(v);
                    }
                    None => null_count += 1,
                }
            }
            ColumnProfile {
                name: column.name.clone(),
                kind: column.kind,
                null_count,
                distinct_count: distinct.len(),
            }
        })
        .collect();

    TableProfile {
        rows: table.row_count(),
        columns,
        duplicate_rows: count_duplicates(table),
    }
}

/// Summarizes every numeric column that has at least one value.
#[must_use]
pub fn describe_numeric(table: &Table) -> Vec<NumericSummary> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| column.kind.is_numeric())
        .filter_map(|(idx, column)| {
            let values: Vec<f64> = table
                .column_values(idx)
                .flatten()
                .filter_map(|raw| parse_cell(column.kind, raw).as_f64())
                .collect();
            summarize(&column.name, values)
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn summarize(column: &str, mut values: Vec<f64>) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.len() > 1).then(|| {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    });

    Some(NumericSummary {
        column: column.to_string(),
        count: values.len(),
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[values.len() - 1],
    })
}

/// Linear-interpolation quantile of sorted, non-empty `values`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
