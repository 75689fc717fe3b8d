//! Per-city results collected while a source moves through the pipeline.

use crime_trends_analytics_models::{
    CategoryCount, CategoryYearTally, PeriodComparison, TableProfile,
};
use crime_trends_source::temporal::DateParseFailure;
use crime_trends_source_models::{Stage, Treatment};
use serde::Serialize;

/// Row count left after one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRows {
    /// The stage that just finished.
    pub stage: Stage,
    /// Rows in its output.
    pub rows: usize,
}

/// Everything learned about one city's dataset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityReport {
    /// Source identifier (e.g. `denver_pd`).
    pub id: String,
    /// Human-readable source name.
    pub name: String,
    /// City name.
    pub city: String,
    /// Two-letter state abbreviation.
    pub state: String,
    /// Whether the source was transformed or only loaded.
    pub treatment: Treatment,
    /// Profile of the table as loaded, before any cleaning.
    pub raw_profile: TableProfile,
    /// Row counts after each stage that ran, in order.
    pub stage_rows: Vec<StageRows>,
    /// Exact duplicate rows removed by the cleaner.
    pub duplicates_removed: usize,
    /// Columns removed by the cleaner.
    pub columns_dropped: usize,
    /// Rows whose date could not be turned into a year.
    pub unparsed_dates: usize,
    /// The first few of those rows.
    pub unparsed_date_samples: Vec<DateParseFailure>,
    /// Tallies and comparison, present for transformed sources.
    pub analysis: Option<CityAnalysis>,
}

impl CityReport {
    /// Rows left after the last stage that ran.
    #[must_use]
    pub fn final_rows(&self) -> usize {
        self.stage_rows
            .last()
            .map_or(self.raw_profile.rows, |s| s.rows)
    }
}

/// Aggregates for a transformed source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAnalysis {
    /// Name of the year column the tally was keyed on.
    pub year_column: String,
    /// Name of the category column the tally was keyed on.
    pub category_column: String,
    /// Incident count per `(year, category)`.
    pub tally: CategoryYearTally,
    /// Sum of the weight column per `(year, category)`, when configured.
    pub weighted: Option<CategoryYearTally>,
    /// Category frequencies across all years, most common first.
    pub top_categories: Vec<CategoryCount>,
    /// Before/after comparison around the pivot year, when one is known.
    pub comparison: Option<PeriodComparison>,
}
