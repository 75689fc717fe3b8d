//! Calendar-year extraction.
//!
//! [`add_year`] never aborts on a bad date. Rows whose date is null or
//! unparseable get a null year and are listed in
//! [`YearTagged::skipped_rows`] so the caller can report them.

use chrono::Datelike as _;
use crime_trends_source_models::{Column, ColumnKind, Table};
use serde::Serialize;

use crate::parsing::parse_datetime_with;
use crate::{SourceError, require_column};

/// How many offending rows to quote in the warning log.
const SKIPPED_ROW_LOG_SAMPLE: usize = 5;

/// A row whose date could not be turned into a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateParseFailure {
    /// Zero-based data row index (the header is not counted).
    pub row: usize,
    /// The raw value, or `None` if the cell was null.
    pub value: Option<String>,
}

impl DateParseFailure {
    /// One-based line number in the source file, counting the header.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.row + 2
    }
}

/// Result of [`add_year`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearTagged {
    /// The input table with the year column set.
    pub table: Table,
    /// Rows left with a null year.
    pub skipped_rows: Vec<DateParseFailure>,
}

/// Parses `date_column` on every row and stores the calendar year as an
/// integer in `output_column`.
///
/// `formats` are chrono format strings tried in order; when empty the
/// default formats from [`crate::parsing`] are used. An existing
/// `output_column` is overwritten in place, otherwise the column is
/// appended.
///
/// # Errors
///
/// Returns [`SourceError::ColumnNotFound`] if `date_column` does not exist.
pub fn add_year(
    table: &Table,
    date_column: &str,
    output_column: &str,
    formats: &[String],
) -> Result<YearTagged, SourceError> {
    let date_idx = require_column(table, date_column)?;

    let mut skipped_rows = Vec::new();
    let years: Vec<String> = table
        .column_values(date_idx)
        .enumerate()
        .map(|(row, value)| {
            match value.and_then(|v| parse_datetime_with(v, formats)) {
                Some(dt) => dt.year().to_string(),
                None => {
                    skipped_rows.push(DateParseFailure {
                        row,
                        value: value.map(String::from),
                    });
                    String::new()
                }
            }
        })
        .collect();

    if !skipped_rows.is_empty() {
        let sample = skipped_rows
            .iter()
            .take(SKIPPED_ROW_LOG_SAMPLE)
            .map(|f| {
                format!(
                    "line {}: {}",
                    f.line(),
                    f.value.as_deref().unwrap_or("<null>")
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        log::warn!(
            "{} of {} rows have no parseable {date_column:?}, year left unknown ({sample})",
            skipped_rows.len(),
            table.row_count()
        );
    }

    let table = table
        .with_column(Column::new(output_column, ColumnKind::Integer), years)
        .map_err(|e| SourceError::Parse {
            message: e.to_string(),
        })?;

    Ok(YearTagged {
        table,
        skipped_rows,
    })
}
