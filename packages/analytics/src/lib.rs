#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Year/category tallies and descriptive statistics over crime tables.
//!
//! [`tally`] turns a year-tagged table into a [`CategoryYearTally`],
//! [`compare`] contrasts the years around a legalization date, and
//! [`profile`] reproduces the shape/null/duplicate checks and numeric
//! summaries used to vet each dataset.
//!
//! [`CategoryYearTally`]: crime_trends_analytics_models::CategoryYearTally

pub mod compare;
pub mod profile;
pub mod tally;

use crime_trends_source_models::Table;
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A referenced column does not exist.
    #[error("Column not found: {column:?} (available: {})", available.join(", "))]
    ColumnNotFound {
        /// The requested column name.
        column: String,
        /// Columns that do exist, in order.
        available: Vec<String>,
    },

    /// An argument is out of range.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of what went wrong.
        message: String,
    },
}

/// Looks up a column index, failing with [`AnalyticsError::ColumnNotFound`].
fn column_index(table: &Table, name: &str) -> Result<usize, AnalyticsError> {
    table
        .column_index(name)
        .ok_or_else(|| AnalyticsError::ColumnNotFound {
            column: name.to_string(),
            available: table
                .column_names()
                .into_iter()
                .map(String::from)
                .collect(),
        })
}
