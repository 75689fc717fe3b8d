#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tally, profile and comparison result types for crime trend analysis.
//!
//! These are the values the aggregator produces and the CLI renders. None of
//! them are mutated after construction.

use std::collections::{BTreeMap, BTreeSet};

use crime_trends_source_models::ColumnKind;
use serde::{Deserialize, Serialize};

/// Incident counts keyed by `(year, category)`.
///
/// Category labels are compared by exact string equality. Pairs that never
/// occur are absent rather than zero. Iteration is sorted by year and then
/// category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "TallySnapshot")]
pub struct CategoryYearTally {
    counts: BTreeMap<(i32, String), u64>,
    excluded_rows: usize,
}

impl CategoryYearTally {
    /// Creates a tally from precomputed counts.
    ///
    /// `excluded_rows` is the number of input rows that had no usable year
    /// or category.
    #[must_use]
    pub const fn from_counts(counts: BTreeMap<(i32, String), u64>, excluded_rows: usize) -> Self {
        Self {
            counts,
            excluded_rows,
        }
    }

    /// Count for one `(year, category)` pair, if present.
    #[must_use]
    pub fn get(&self, year: i32, category: &str) -> Option<u64> {
        self.counts.get(&(year, category.to_string())).copied()
    }

    /// Number of distinct `(year, category)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the tally has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Rows that were left out for lack of a year or category.
    #[must_use]
    pub const fn excluded_rows(&self) -> usize {
        self.excluded_rows
    }

    /// Iterates `(year, category, count)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &str, u64)> {
        self.counts
            .iter()
            .map(|((year, category), count)| (*year, category.as_str(), *count))
    }

    /// Distinct years, ascending.
    #[must_use]
    pub fn years(&self) -> BTreeSet<i32> {
        self.counts.keys().map(|(year, _)| *year).collect()
    }

    /// Distinct categories, ascending.
    #[must_use]
    pub fn categories(&self) -> BTreeSet<&str> {
        self.counts.keys().map(|(_, c)| c.as_str()).collect()
    }

    /// Total count per year, ascending by year.
    #[must_use]
    pub fn year_totals(&self) -> BTreeMap<i32, u64> {
        let mut totals = BTreeMap::new();
        for (year, _, count) in self.iter() {
            *totals.entry(year).or_insert(0) += count;
        }
        totals
    }

    /// Flat list of entries, in sorted order.
    #[must_use]
    pub fn entries(&self) -> Vec<TallyEntry> {
        self.iter()
            .map(|(year, category, count)| TallyEntry {
                year,
                category: category.to_string(),
                count,
            })
            .collect()
    }
}

/// One `(year, category)` count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyEntry {
    /// Calendar year.
    pub year: i32,
    /// City-specific category label.
    pub category: String,
    /// Number of incidents.
    pub count: u64,
}

/// Serialized form of [`CategoryYearTally`] (JSON maps cannot have tuple
/// keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    /// All entries, sorted by year then category.
    pub entries: Vec<TallyEntry>,
    /// Sum of all counts.
    pub total: u64,
    /// Rows left out for lack of a year or category.
    pub excluded_rows: usize,
}

impl From<CategoryYearTally> for TallySnapshot {
    fn from(tally: CategoryYearTally) -> Self {
        Self {
            entries: tally.entries(),
            total: tally.total(),
            excluded_rows: tally.excluded_rows,
        }
    }
}

/// Zero-filled year x category grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCategoryMatrix {
    /// Row axis, ascending.
    pub years: Vec<i32>,
    /// Column axis, ascending.
    pub categories: Vec<String>,
    /// `counts[y][c]` is the count for `years[y]` and `categories[c]`.
    pub counts: Vec<Vec<u64>>,
}

/// Count of incidents in a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Category label.
    pub category: String,
    /// Number of incidents.
    pub count: u64,
}

/// Before/after totals for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChange {
    /// Category label (`"ALL"` for the overall row).
    pub category: String,
    /// Total in the years before the pivot.
    pub before: u64,
    /// Total in the years after the pivot.
    pub after: u64,
    /// `after - before`.
    pub change: i64,
    /// Percentage change from `before` to `after`. `None` when `before` is
    /// zero.
    pub percent_change: Option<f64>,
}

/// Comparison of the windows on either side of a pivot (legalization) year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    /// The year separating the two windows. It belongs to neither.
    pub pivot_year: i32,
    /// Number of years in each window.
    pub window: u32,
    /// Inclusive `(first, last)` years before the pivot.
    pub before_years: (i32, i32),
    /// Inclusive `(first, last)` years after the pivot.
    pub after_years: (i32, i32),
    /// Totals across every category.
    pub overall: CategoryChange,
    /// Per-category breakdown, sorted by category.
    pub by_category: Vec<CategoryChange>,
}

/// Null and kind information for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    /// Column name.
    pub name: String,
    /// Inferred kind.
    pub kind: ColumnKind,
    /// Number of null cells.
    pub null_count: usize,
    /// Number of distinct non-null values.
    pub distinct_count: usize,
}

/// Shape, null counts and duplicate count for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProfile {
    /// Number of rows.
    pub rows: usize,
    /// Per-column details, in column order.
    pub columns: Vec<ColumnProfile>,
    /// Rows that exactly repeat an earlier row.
    pub duplicate_rows: usize,
}

/// Summary statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSummary {
    /// Column name.
    pub column: String,
    /// Number of non-null values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (`n - 1`). `None` with fewer than two
    /// values.
    pub std: Option<f64>,
    /// Minimum.
    pub min: f64,
    /// 25th percentile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub q75: f64,
    /// Maximum.
    pub max: f64,
}
