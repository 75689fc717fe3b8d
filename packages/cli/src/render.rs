//! Plain-text and JSON rendering of profiles, tallies and city reports.

use crime_trends_analytics::tally::year_category_matrix;
use crime_trends_analytics_models::{
    CategoryChange, CategoryYearTally, NumericSummary, PeriodComparison, TableProfile,
    YearCategoryMatrix,
};
use crime_trends_pipeline::{CityReport, SourceOutcome};
use crime_trends_source::source_def::SourceDefinition;
use crime_trends_source_models::Stage;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

/// Output format for every subcommand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    /// Aligned, human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// How many categories to list under each city in the text report.
const TOP_CATEGORIES: usize = 10;

/// Lists the configured sources.
#[must_use]
pub fn sources_text(sources: &[SourceDefinition]) -> String {
    let mut lines = vec![
        format!("{:<26} {:<10} {:<6} NAME", "ID", "TREATMENT", "PIVOT"),
        "-".repeat(72),
    ];
    for source in sources {
        let pivot = source
            .legalization_year
            .map_or_else(|| "-".to_string(), |y| y.to_string());
        lines.push(format!(
            "{:<26} {:<10} {:<6} {}",
            source.id(),
            source.treatment.as_ref(),
            pivot,
            source.name()
        ));
    }
    lines.join("\n")
}

/// Shape, per-column nulls and numeric summaries of a loaded table.
#[must_use]
pub fn profile_text(title: &str, profile: &TableProfile, numeric: &[NumericSummary]) -> String {
    let mut lines = vec![
        title.to_string(),
        format!(
            "  {} rows x {} columns, {} duplicate rows",
            profile.rows,
            profile.columns.len(),
            profile.duplicate_rows
        ),
        String::new(),
        format!("  {:<36} {:<9} {:>10} {:>10}", "COLUMN", "KIND", "NULLS", "DISTINCT"),
    ];
    for column in &profile.columns {
        lines.push(format!(
            "  {:<36} {:<9} {:>10} {:>10}",
            column.name,
            column.kind.as_ref(),
            column.null_count,
            column.distinct_count
        ));
    }

    if !numeric.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "  {:<24} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "NUMERIC", "COUNT", "MEAN", "STD", "MIN", "25%", "50%", "75%", "MAX"
        ));
        for s in numeric {
            let std = s.std.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
            lines.push(format!(
                "  {:<24} {:>8} {:>12.3} {:>12} {:>12.3} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
                s.column, s.count, s.mean, std, s.min, s.q25, s.median, s.q75, s.max
            ));
        }
    }

    lines.join("\n")
}

/// One line per `(year, category)` pair, followed by per-year totals.
#[must_use]
pub fn tally_text(tally: &CategoryYearTally) -> String {
    let width = tally
        .categories()
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(0)
        .max("CATEGORY".len());

    let mut lines = vec![format!("{:<6} {:<width$} {:>10}", "YEAR", "CATEGORY", "COUNT")];
    for (year, category, count) in tally.iter() {
        lines.push(format!("{year:<6} {category:<width$} {count:>10}"));
    }

    lines.push(String::new());
    for (year, total) in tally.year_totals() {
        lines.push(format!("{year:<6} {:<width$} {total:>10}", "(total)"));
    }
    lines.push(format!(
        "{} incidents counted, {} rows excluded",
        tally.total(),
        tally.excluded_rows()
    ));
    lines.join("\n")
}

fn change_line(change: &CategoryChange, width: usize) -> String {
    let percent = change
        .percent_change
        .map_or_else(|| "n/a".to_string(), |p| format!("{p:+.1}%"));
    format!(
        "{:<width$} {:>10} {:>10} {:>+10} {:>9}",
        change.category, change.before, change.after, change.change, percent
    )
}

/// Before/after table around the pivot year.
#[must_use]
pub fn comparison_text(comparison: &PeriodComparison) -> String {
    let width = comparison
        .by_category
        .iter()
        .map(|c| c.category.len())
        .max()
        .unwrap_or(0)
        .max("CATEGORY".len());
    let (b0, b1) = comparison.before_years;
    let (a0, a1) = comparison.after_years;

    let mut lines = vec![
        format!("Pivot {}: {b0}-{b1} vs {a0}-{a1}", comparison.pivot_year),
        format!(
            "{:<width$} {:>10} {:>10} {:>10} {:>9}",
            "CATEGORY", "BEFORE", "AFTER", "CHANGE", "PERCENT"
        ),
    ];
    lines.extend(
        comparison
            .by_category
            .iter()
            .map(|change| change_line(change, width)),
    );
    lines.push(change_line(&comparison.overall, width));
    lines.join("\n")
}

/// Full text report for one city.
#[must_use]
pub fn report_text(report: &CityReport) -> String {
    let stages = report
        .stage_rows
        .iter()
        .map(|s| format!("{} {}", s.stage, s.rows))
        .collect::<Vec<_>>()
        .join(" -> ");

    let mut lines = vec![
        format!(
            "== {} ({}, {}) [{}] ==",
            report.name, report.city, report.state, report.id
        ),
        format!("Rows by stage: {stages}"),
    ];

    if report.stage_rows.iter().any(|s| s.stage == Stage::Clean) {
        lines.push(format!(
            "Cleaned: {} duplicates removed, {} columns dropped",
            report.duplicates_removed, report.columns_dropped
        ));
    }
    if report.unparsed_dates > 0 {
        let samples = report
            .unparsed_date_samples
            .iter()
            .map(|f| format!("line {}: {:?}", f.line(), f.value.as_deref().unwrap_or("")))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Unparseable dates: {} ({samples})", report.unparsed_dates));
    }

    match &report.analysis {
        None => {
            lines.push(String::new());
            lines.push(profile_text("Profile (load only)", &report.raw_profile, &[]));
        }
        Some(analysis) => {
            lines.push(String::new());
            lines.push(tally_text(&analysis.tally));

            if let Some(weighted) = &analysis.weighted {
                lines.push(String::new());
                lines.push("Weighted tally:".to_string());
                lines.push(tally_text(weighted));
            }

            lines.push(String::new());
            lines.push(format!("Top {}:", analysis.category_column));
            for c in analysis.top_categories.iter().take(TOP_CATEGORIES) {
                lines.push(format!("  {:<40} {:>10}", c.category, c.count));
            }

            if let Some(comparison) = &analysis.comparison {
                lines.push(String::new());
                lines.push(comparison_text(comparison));
            }
        }
    }

    lines.join("\n")
}

/// Text for every outcome, failures included, plus a summary line.
#[must_use]
pub fn outcomes_text(outcomes: &[SourceOutcome]) -> String {
    let mut sections: Vec<String> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(report) => report_text(report),
            Err(e) => format!("== {} ==\nFAILED: {e}", outcome.source_id),
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    sections.push(format!(
        "{} of {} sources succeeded",
        outcomes.len() - failed,
        outcomes.len()
    ));
    sections.join("\n\n")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeJson<'a> {
    source_id: &'a str,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a CityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<FailureJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureJson {
    stage: Stage,
    message: String,
}

/// JSON array with one object per outcome.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn outcomes_json(outcomes: &[SourceOutcome]) -> Result<String, serde_json::Error> {
    let entries: Vec<OutcomeJson<'_>> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(report) => OutcomeJson {
                source_id: &outcome.source_id,
                succeeded: true,
                report: Some(report),
                error: None,
            },
            Err(e) => OutcomeJson {
                source_id: &outcome.source_id,
                succeeded: false,
                report: None,
                error: Some(FailureJson {
                    stage: e.stage,
                    message: e.kind.to_string(),
                }),
            },
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileJson<'a> {
    profile: &'a TableProfile,
    numeric: &'a [NumericSummary],
}

/// JSON with the table profile and numeric summaries.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn profile_json(
    profile: &TableProfile,
    numeric: &[NumericSummary],
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ProfileJson { profile, numeric })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TallyJson<'a> {
    tally: &'a CategoryYearTally,
    matrix: YearCategoryMatrix,
}

/// JSON with the sparse tally and its zero-filled matrix.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn tally_json(tally: &CategoryYearTally) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&TallyJson {
        tally,
        matrix: year_category_matrix(tally),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crime_trends_analytics::compare::compare_periods;

    use super::*;

    fn tally() -> CategoryYearTally {
        CategoryYearTally::from_counts(
            BTreeMap::from([
                ((2011, "theft".to_string()), 4),
                ((2013, "theft".to_string()), 2),
                ((2013, "assault".to_string()), 1),
            ]),
            2,
        )
    }

    #[test]
    fn parses_output_format() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::default().to_string(), "text");
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn tally_text_lists_pairs_and_totals() {
        let text = tally_text(&tally());
        assert!(text.lines().any(|l| l.starts_with("2013") && l.contains("assault")));
        assert!(text.lines().any(|l| l.contains("(total)") && l.ends_with(" 3")));
        assert!(text.ends_with("7 incidents counted, 2 rows excluded"));
    }

    #[test]
    fn comparison_text_marks_missing_baseline() {
        let comparison = compare_periods(&tally(), 2012, 1).unwrap();
        let text = comparison_text(&comparison);
        assert!(text.starts_with("Pivot 2012: 2011-2011 vs 2013-2013"));
        let assault = text.lines().find(|l| l.starts_with("assault")).unwrap();
        assert!(assault.ends_with("n/a"));
        let theft = text.lines().find(|l| l.starts_with("theft")).unwrap();
        assert!(theft.ends_with("-50.0%"));
    }

    #[test]
    fn tally_json_includes_dense_matrix() {
        let json: serde_json::Value = serde_json::from_str(&tally_json(&tally()).unwrap()).unwrap();
        assert_eq!(json["tally"]["total"], 7);
        assert_eq!(json["matrix"]["years"], serde_json::json!([2011, 2013]));
        assert_eq!(json["matrix"]["categories"], serde_json::json!(["assault", "theft"]));
        assert_eq!(json["matrix"]["counts"], serde_json::json!([[0, 4], [1, 2]]));
    }
}
