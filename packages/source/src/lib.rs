#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crime dataset loading, cleaning and year normalization.
//!
//! Each city is described by a [`source_def::SourceDefinition`] (embedded
//! TOML, see [`registry`]). Its delimited file is read by [`loader`],
//! de-duplicated and trimmed by [`clean`], and tagged with a calendar year
//! by [`temporal`]. Every stage takes a [`Table`] and returns a new one.

pub mod clean;
pub mod loader;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod source_def;
pub mod temporal;

pub use crime_trends_source_models::Table;

/// Errors that can occur while loading or transforming a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The file is missing or unreadable.
    #[error("I/O error reading {origin}: {source}")]
    Io {
        /// Path (or label) of the input.
        origin: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The delimited structure is malformed (e.g. a ragged row).
    #[error("CSV error in {origin}: {source}")]
    Csv {
        /// Path (or label) of the input.
        origin: String,
        /// Underlying CSV error, including the offending line.
        source: csv::Error,
    },

    /// The input parsed but does not form a usable table.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// A stage referenced a column that the table does not have.
    #[error("Column not found: {column:?} (available: {})", available.join(", "))]
    ColumnNotFound {
        /// The requested column name.
        column: String,
        /// Columns that do exist, in order.
        available: Vec<String>,
    },

    /// A source definition is invalid.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Builds a [`SourceError::ColumnNotFound`] listing the table's columns.
    #[must_use]
    pub fn column_not_found(column: &str, table: &Table) -> Self {
        Self::ColumnNotFound {
            column: column.to_string(),
            available: table
                .column_names()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Looks up a column index, failing with [`SourceError::ColumnNotFound`].
///
/// # Errors
///
/// Returns [`SourceError::ColumnNotFound`] if `name` is not a column of
/// `table`.
pub fn require_column(table: &Table, name: &str) -> Result<usize, SourceError> {
    table
        .column_index(name)
        .ok_or_else(|| SourceError::column_not_found(name, table))
}
