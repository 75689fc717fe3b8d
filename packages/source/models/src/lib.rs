#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular incident data types and source configuration enums.
//!
//! Every city dataset is loaded into a [`Table`]: an ordered list of typed
//! [`Column`]s and rows of raw string cells. Each pipeline stage consumes a
//! `Table` and produces a new one; nothing is mutated in place.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Cell literals that are treated as missing values.
pub const NULL_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null"];

/// Returns `true` if the raw cell text represents a missing value.
#[must_use]
pub fn is_null(raw: &str) -> bool {
    NULL_MARKERS.contains(&raw.trim())
}

/// Inferred type of a column, from narrowest to widest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColumnKind {
    /// Every value in the column is null.
    Empty,
    /// Every non-null value parses as an `i64`.
    Integer,
    /// Every non-null value parses as an `f64`.
    Float,
    /// Every non-null value parses as a date or date-time.
    DateTime,
    /// Anything else.
    Text,
}

impl ColumnKind {
    /// Whether values of this kind can be summarized numerically.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Missing value.
    Null,
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Naive (timezone-less) date-time value.
    DateTime(NaiveDateTime),
    /// Free text.
    Text(String),
}

impl CellValue {
    /// Returns the value as an `f64` if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this value is [`CellValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Header name as it appears in the source file (trimmed).
    pub name: String,
    /// Inferred type.
    pub kind: ColumnKind,
}

impl Column {
    /// Creates a new column.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Error returned when a row's width does not match the column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableShapeError {
    /// Zero-based row index.
    pub row: usize,
    /// Number of columns in the table.
    pub expected: usize,
    /// Number of cells in the offending row.
    pub found: usize,
}

impl std::fmt::Display for TableShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "row {} has {} cells, expected {}",
            self.row, self.found, self.expected
        )
    }
}

impl std::error::Error for TableShapeError {}

/// An in-memory tabular dataset.
///
/// Rows keep the order they had in the source file. Cells are stored as the
/// raw (trimmed) text; use [`Table::column_values`] to skip nulls and the
/// source crate's cell parser for typed access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table, checking that every row has one cell per column.
    ///
    /// # Errors
    ///
    /// Returns [`TableShapeError`] for the first row with the wrong width.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<String>>) -> Result<Self, TableShapeError> {
        let expected = columns.len();
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(TableShapeError {
                row,
                expected,
                found: cells.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// The table's columns, in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names, in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// All rows, in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of the column with exactly this name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Raw cell text at `(row, col)`, or `None` if the cell is null or out
    /// of range.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|s| !is_null(s))
    }

    /// Iterates the cells of one column, yielding `None` for nulls.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows.iter().map(move |r| {
            r.get(col)
                .map(String::as_str)
                .filter(|s| !is_null(s))
        })
    }

    /// Returns a copy holding only the rows for which `keep` is `true`, in
    /// their original order.
    #[must_use]
    pub fn filter_rows<'a>(&'a self, mut keep: impl FnMut(&'a [String]) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| keep(r.as_slice()))
                .cloned()
                .collect(),
        }
    }

    /// Returns a copy holding only the columns at `indices`, in the order
    /// given. Out-of-range indices are ignored.
    #[must_use]
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let indices: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.columns.len())
            .collect();
        Self {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Returns a copy with `column` holding `values`. A column with the same
    /// name is replaced in place; otherwise the column is appended.
    ///
    /// # Errors
    ///
    /// Returns [`TableShapeError`] if `values` does not have one entry per
    /// row.
    pub fn with_column(&self, column: Column, values: Vec<String>) -> Result<Self, TableShapeError> {
        if values.len() != self.rows.len() {
            return Err(TableShapeError {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }

        let position = self.column_index(&column.name);
        let mut columns = self.columns.clone();
        let mut rows = self.rows.clone();

        match position {
            Some(idx) => {
                columns[idx] = column;
                for (row, value) in rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                columns.push(column);
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }

        Ok(Self { columns, rows })
    }
}

/// Pipeline stage, used to attribute failures.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Reading the delimited file.
    Load,
    /// De-duplication and column drops.
    Clean,
    /// Year extraction.
    Normalize,
    /// Year/category tallying.
    Aggregate,
}

/// How far through the pipeline a source is taken.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Treatment {
    /// Load, clean, normalize and aggregate.
    #[default]
    Transform,
    /// Load and profile only.
    LoadOnly,
}

/// What to do when a column named in a drop set is absent.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Fail with a column-not-found error.
    #[default]
    Fail,
    /// Skip the name and log a warning.
    Ignore,
}
