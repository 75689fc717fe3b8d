#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Drives each city's dataset through load, clean, normalize and aggregate.
//!
//! Cities are independent: a failure in one stops that city's remaining
//! stages and is returned as a [`PipelineError`], while every other city
//! still runs to completion.

pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crime_trends_analytics::AnalyticsError;
use crime_trends_analytics::compare::{DEFAULT_WINDOW, compare_periods};
use crime_trends_analytics::profile::profile_table;
use crime_trends_analytics::tally::{category_counts, tally_by_year_and_category, weighted_tally};
use crime_trends_source::SourceError;
use crime_trends_source::clean::{deduplicate, drop_columns};
use crime_trends_source::loader::load_table;
use crime_trends_source::progress::StageProgress;
use crime_trends_source::source_def::SourceDefinition;
use crime_trends_source::temporal::add_year;
use crime_trends_source_models::Stage;
use thiserror::Error;

pub use report::{CityAnalysis, CityReport, StageRows};

/// Environment variable holding a comma-separated list of source ids.
pub const SOURCES_ENV_VAR: &str = "CRIME_TRENDS_SOURCES";

/// How many unparseable date rows to keep in a [`CityReport`].
pub const UNPARSED_DATE_SAMPLE: usize = 10;

/// What went wrong inside a stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// Loading, cleaning or normalizing failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Tallying or comparing failed.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// The task running the city panicked or was cancelled.
    #[error("Task failed: {message}")]
    Task {
        /// Description from the runtime.
        message: String,
    },
}

/// A stage failure, attributed to a city and a stage.
#[derive(Debug, Error)]
#[error("{source_id}: {stage} stage failed: {kind}")]
pub struct PipelineError {
    /// The city's source id.
    pub source_id: String,
    /// The stage that failed.
    pub stage: Stage,
    /// The underlying error.
    #[source]
    pub kind: StageError,
}

impl PipelineError {
    fn new(source_id: &str, stage: Stage, kind: impl Into<StageError>) -> Self {
        Self {
            source_id: source_id.to_string(),
            stage,
            kind: kind.into(),
        }
    }
}

/// Knobs for the aggregate stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Years on each side of the pivot in the period comparison.
    pub window: u32,
    /// Overrides each source's legalization year as the pivot.
    pub pivot_year: Option<i32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            pivot_year: None,
        }
    }
}

/// The result of running one source.
#[derive(Debug)]
pub struct SourceOutcome {
    /// The source id.
    pub source_id: String,
    /// The city's report, or the stage that failed.
    pub result: Result<CityReport, PipelineError>,
}

/// Returns all configured sources from the TOML registry.
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    crime_trends_source::registry::all_sources()
}

/// Returns the sources to run, filtered by the `--sources` CLI flag or the
/// `CRIME_TRENDS_SOURCES` environment variable. If neither is set, all
/// sources are returned.
#[must_use]
pub fn enabled_sources(cli_filter: Option<String>) -> Vec<SourceDefinition> {
    let filter = cli_filter.or_else(|| std::env::var(SOURCES_ENV_VAR).ok());

    let all = all_sources();

    let Some(filter_str) = filter else {
        return all;
    };

    let ids: Vec<&str> = filter_str
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    let filtered: Vec<SourceDefinition> =
        all.into_iter().filter(|s| ids.contains(&s.id())).collect();

    if filtered.is_empty() {
        log::warn!(
            "No matching sources found for filter {:?}. Available: {}",
            ids,
            all_sources()
                .iter()
                .map(|s| s.id().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    filtered
}

/// Loads a source's file and, for transformed sources, cleans, normalizes
/// and aggregates it.
///
/// `progress` always receives a matching `source_finished` call, whether or
/// not a stage fails.
///
/// # Errors
///
/// Returns a [`PipelineError`] naming the first stage that failed.
pub fn run_source(
    def: &SourceDefinition,
    data_dir: &Path,
    options: &RunOptions,
    progress: &dyn StageProgress,
) -> Result<CityReport, PipelineError> {
    let start = Instant::now();
    log::info!("Processing source: {} ({})", def.name(), def.id());
    progress.source_started(def.id());

    let result = run_stages(def, data_dir, options, progress);

    progress.source_finished(def.id(), result.is_ok());
    match &result {
        Ok(report) => log::info!(
            "{}: finished with {} rows in {:.2}s",
            def.name(),
            report.final_rows(),
            start.elapsed().as_secs_f64()
        ),
        Err(e) => log::error!("{e}"),
    }

    result
}

#[allow(clippy::too_many_lines)]
fn run_stages(
    def: &SourceDefinition,
    data_dir: &Path,
    options: &RunOptions,
    progress: &dyn StageProgress,
) -> Result<CityReport, PipelineError> {
    let id = def.id();
    let at = |stage: Stage| move |e: SourceError| PipelineError::new(id, stage, e);

    // Load
    let delimiter = def.delimiter().map_err(at(Stage::Load))?;
    let raw = load_table(&def.path_in(data_dir), delimiter).map_err(at(Stage::Load))?;
    progress.stage_finished(id, Stage::Load, raw.row_count());

    let mut report = CityReport {
        id: id.to_string(),
        name: def.name.clone(),
        city: def.city.clone(),
        state: def.state.clone(),
        treatment: def.treatment,
        raw_profile: profile_table(&raw),
        stage_rows: vec![StageRows {
            stage: Stage::Load,
            rows: raw.row_count(),
        }],
        duplicates_removed: 0,
        columns_dropped: 0,
        unparsed_dates: 0,
        unparsed_date_samples: Vec::new(),
        analysis: None,
    };

    let Some(fields) = def.fields.as_ref().filter(|_| def.is_transformed()) else {
        log::info!("{id}: load only, skipping clean/normalize/aggregate");
        return Ok(report);
    };

    // Clean
    let table = if def.clean.deduplicate {
        let deduped = deduplicate(&raw);
        report.duplicates_removed = deduped.removed;
        deduped.table
    } else {
        raw
    };
    let cleaned = drop_columns(
        &table,
        &def.clean.drop_columns,
        def.clean.on_missing_column,
    )
    .map_err(at(Stage::Clean))?;
    report.columns_dropped = table.column_count() - cleaned.column_count();
    log::debug!(
        "{id}: cleaned to {} rows x {} columns ({} duplicates removed)",
        cleaned.row_count(),
        cleaned.column_count(),
        report.duplicates_removed
    );
    report.stage_rows.push(StageRows {
        stage: Stage::Clean,
        rows: cleaned.row_count(),
    });
    progress.stage_finished(id, Stage::Clean, cleaned.row_count());

    // Normalize
    let tagged = add_year(&cleaned, &fields.date, &fields.year, &fields.date_formats)
        .map_err(at(Stage::Normalize))?;
    report.unparsed_dates = tagged.skipped_rows.len();
    report.unparsed_date_samples = tagged
        .skipped_rows
        .iter()
        .take(UNPARSED_DATE_SAMPLE)
        .cloned()
        .collect();
    report.stage_rows.push(StageRows {
        stage: Stage::Normalize,
        rows: tagged.table.row_count(),
    });
    progress.stage_finished(id, Stage::Normalize, tagged.table.row_count());

    // Aggregate
    let aggregate_err = |e: AnalyticsError| PipelineError::new(id, Stage::Aggregate, e);
    let table = &tagged.table;

    let tally =
        tally_by_year_and_category(table, &fields.year, &fields.category).map_err(aggregate_err)?;
    let weighted = fields
        .weight
        .as_deref()
        .map(|weight| weighted_tally(table, &fields.year, &fields.category, weight))
        .transpose()
        .map_err(aggregate_err)?;
    let top_categories = category_counts(table, &fields.category).map_err(aggregate_err)?;

    let pivot_year = options.pivot_year.or(def.legalization_year);
    let comparison = pivot_year
        .map(|pivot| compare_periods(&tally, pivot, options.window))
        .transpose()
        .map_err(aggregate_err)?;

    let counted = table.row_count() - tally.excluded_rows();
    report.stage_rows.push(StageRows {
        stage: Stage::Aggregate,
        rows: counted,
    });
    progress.stage_finished(id, Stage::Aggregate, counted);

    report.analysis = Some(CityAnalysis {
        year_column: fields.year.clone(),
        category_column: fields.category.clone(),
        tally,
        weighted,
        top_categories,
        comparison,
    });

    Ok(report)
}

/// Runs every source one after another.
#[must_use]
pub fn run_all(
    sources: &[SourceDefinition],
    data_dir: &Path,
    options: &RunOptions,
    progress: &dyn StageProgress,
) -> Vec<SourceOutcome> {
    sources
        .iter()
        .map(|def| SourceOutcome {
            source_id: def.id().to_string(),
            result: run_source(def, data_dir, options, progress),
        })
        .collect()
}

/// Runs every source on its own blocking task and waits for all of them.
///
/// Outcomes are returned in the order of `sources` and are identical to
/// what [`run_all`] would produce.
pub async fn run_all_concurrent(
    sources: Vec<SourceDefinition>,
    data_dir: PathBuf,
    options: RunOptions,
    progress: Arc<dyn StageProgress>,
) -> Vec<SourceOutcome> {
    let tasks = sources.into_iter().map(|def| {
        let data_dir = data_dir.clone();
        let progress = Arc::clone(&progress);
        async move {
            let source_id = def.id().to_string();
            let result = tokio::task::spawn_blocking(move || {
                run_source(&def, &data_dir, &options, progress.as_ref())
            })
            .await
            .unwrap_or_else(|e| {
                // Which stage was running is lost with the task.
                Err(PipelineError::new(
                    &source_id,
                    Stage::Load,
                    StageError::Task {
                        message: e.to_string(),
                    },
                ))
            });
            SourceOutcome { source_id, result }
        }
    });

    futures::future::join_all(tasks).await
}

#[cfg(test)]
mod tests {
    use crime_trends_source::progress::NullProgress;
    use crime_trends_source::registry::find_source;
    use crime_trends_source_models::MissingColumnPolicy;

    use super::*;

    const DENVER_HEADER: &str = "incident_id,offense_id,offense_code,offense_code_extension,\
offense_type_id,offense_category_id,first_occurrence_date,last_occurrence_date,reported_date,\
incident_address,geo_x,geo_y,geo_lon,geo_lat,district_id,precinct_id,neighborhood_id,\
is_crime,is_traffic,victim_count";

    fn denver_row(id: u32, category: &str, reported: &str) -> String {
        format!(
            "{id},{id}01,2399,0,{category}-other,{category},{reported},,{reported},\
123 MAIN ST,3144000,1700000,-104.98,39.74,6,611,capitol-hill,1,0,1"
        )
    }

    fn denver_csv() -> String {
        let rows = [
            denver_row(1, "theft", "2013-01-15 09:30:00"),
            denver_row(2, "theft", "2013-03-02 17:05:00"),
            denver_row(3, "assault", "2013-07-04 23:59:00"),
            denver_row(4, "theft", "2014-02-11 08:00:00"),
            denver_row(5, "assault", "2014-05-20 12:00:00"),
            denver_row(6, "assault", "2014-12-31 22:15:00"),
        ];
        format!("{DENVER_HEADER}\n{}\n", rows.join("\n"))
    }

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("crime_trends_pipeline_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn denver() -> SourceDefinition {
        find_source("denver_pd").unwrap()
    }

    fn kansas_city() -> SourceDefinition {
        find_source("kansas_city_pd").unwrap()
    }

    #[test]
    fn denver_end_to_end() {
        let dir = fixture_dir("denver_end_to_end");
        let def = denver();
        std::fs::write(def.path_in(&dir), denver_csv()).unwrap();

        let report = run_source(&def, &dir, &RunOptions::default(), &NullProgress).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(report.raw_profile.rows, 6);
        assert_eq!(report.raw_profile.columns.len(), 20);
        assert_eq!(report.columns_dropped, 17);
        assert_eq!(report.unparsed_dates, 0);
        assert_eq!(report.final_rows(), 6);

        let stages: Vec<Stage> = report.stage_rows.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![Stage::Load, Stage::Clean, Stage::Normalize, Stage::Aggregate]
        );

        let analysis = report.analysis.unwrap();
        let tally = &analysis.tally;
        assert_eq!(tally.get(2013, "theft"), Some(2));
        assert_eq!(tally.get(2013, "assault"), Some(1));
        assert_eq!(tally.get(2014, "theft"), Some(1));
        assert_eq!(tally.get(2014, "assault"), Some(2));
        assert_eq!(tally.len(), 4);
        assert_eq!(tally.total(), 6);
        assert!(analysis.weighted.is_none());

        let comparison = analysis.comparison.unwrap();
        assert_eq!(comparison.pivot_year, 2012);
        assert_eq!(comparison.overall.before, 0);
        assert_eq!(comparison.overall.after, 6);
    }

    #[test]
    fn malformed_city_does_not_stop_the_others() {
        let dir = fixture_dir("isolation");
        let denver = denver();
        let kansas_city = kansas_city();
        std::fs::write(denver.path_in(&dir), denver_csv()).unwrap();
        std::fs::write(
            kansas_city.path_in(&dir),
            "Report_No,Reported_Date,Offense\n1,01/01/2010,Stealing\n2,01/02/2010\n",
        )
        .unwrap();

        let outcomes = run_all(
            &[kansas_city, denver],
            &dir,
            &RunOptions::default(),
            &NullProgress,
        );
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].source_id, "kansas_city_pd");
        let err = outcomes[0].result.as_ref().unwrap_err();
        assert_eq!(err.stage, Stage::Load);
        assert!(matches!(
            err.kind,
            StageError::Source(SourceError::Csv { .. })
        ));

        let report = outcomes[1].result.as_ref().unwrap();
        assert_eq!(report.analysis.as_ref().unwrap().tally.total(), 6);
    }

    #[test]
    fn missing_file_fails_at_load() {
        let dir = fixture_dir("missing_file");
        let err = run_source(&denver(), &dir, &RunOptions::default(), &NullProgress).unwrap_err();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(err.source_id, "denver_pd");
        assert_eq!(err.stage, Stage::Load);
        assert!(matches!(err.kind, StageError::Source(SourceError::Io { .. })));
        assert!(err.to_string().starts_with("denver_pd: load stage failed"));
    }

    #[test]
    fn missing_drop_column_fails_at_clean_unless_ignored() {
        let dir = fixture_dir("missing_drop_column");
        let mut def = denver();
        def.clean.drop_columns.push("not_a_column".to_string());
        std::fs::write(def.path_in(&dir), denver_csv()).unwrap();

        let err = run_source(&def, &dir, &RunOptions::default(), &NullProgress).unwrap_err();
        assert_eq!(err.stage, Stage::Clean);
        assert!(matches!(
            err.kind,
            StageError::Source(SourceError::ColumnNotFound { ref column, .. }) if column == "not_a_column"
        ));

        def.clean.on_missing_column = MissingColumnPolicy::Ignore;
        let report = run_source(&def, &dir, &RunOptions::default(), &NullProgress).unwrap();
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(report.columns_dropped, 17);
    }

    #[test]
    fn load_only_sources_stop_after_loading() {
        let dir = fixture_dir("load_only");
        let def = kansas_city();
        std::fs::write(
            def.path_in(&dir),
            "Report_No,Reported_Date,Offense\n1,01/01/2010,Stealing\n2,01/02/2010,Stealing\n",
        )
        .unwrap();

        let report = run_source(&def, &dir, &RunOptions::default(), &NullProgress).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(report.stage_rows.len(), 1);
        assert_eq!(report.raw_profile.rows, 2);
        assert!(report.analysis.is_none());
    }

    #[test]
    fn unparseable_dates_are_reported_not_fatal() {
        let dir = fixture_dir("bad_dates");
        let def = denver();
        let csv = format!(
            "{}{}\n",
            denver_csv(),
            denver_row(7, "theft", "not a date")
        );
        std::fs::write(def.path_in(&dir), csv).unwrap();

        let report = run_source(&def, &dir, &RunOptions::default(), &NullProgress).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(report.unparsed_dates, 1);
        assert_eq!(report.unparsed_date_samples[0].line(), 8);
        let analysis = report.analysis.unwrap();
        assert_eq!(analysis.tally.total(), 6);
        assert_eq!(analysis.tally.excluded_rows(), 1);
    }

    #[test]
    fn pivot_year_override_and_window_apply() {
        let dir = fixture_dir("pivot_override");
        let def = denver();
        std::fs::write(def.path_in(&dir), denver_csv()).unwrap();

        let options = RunOptions {
            window: 1,
            pivot_year: Some(2014),
        };
        let report = run_source(&def, &dir, &options, &NullProgress).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        let comparison = report.analysis.unwrap().comparison.unwrap();
        assert_eq!(comparison.before_years, (2013, 2013));
        assert_eq!(comparison.after_years, (2015, 2015));
        assert_eq!(comparison.overall.before, 3);
        assert_eq!(comparison.overall.after, 0);
    }

    #[tokio::test]
    async fn concurrent_run_matches_sequential() {
        let dir = fixture_dir("concurrent");
        let sources = vec![kansas_city(), denver()];
        std::fs::write(sources[1].path_in(&dir), denver_csv()).unwrap();
        std::fs::write(sources[0].path_in(&dir), "a,b\n1,2,3\n").unwrap();

        let sequential = run_all(&sources, &dir, &RunOptions::default(), &NullProgress);
        let concurrent = run_all_concurrent(
            sources,
            dir.clone(),
            RunOptions::default(),
            Arc::new(NullProgress),
        )
        .await;
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(sequential.len(), concurrent.len());
        for (seq, con) in sequential.iter().zip(&concurrent) {
            assert_eq!(seq.source_id, con.source_id);
            match (&seq.result, &con.result) {
                (Ok(a), Ok(b)) => {
                    let (a, b) = (a.analysis.as_ref().unwrap(), b.analysis.as_ref().unwrap());
                    assert_eq!(a.tally, b.tally);
                }
                (Err(a), Err(b)) => assert_eq!(a.stage, b.stage),
                _ => panic!("outcomes differ for {}", seq.source_id),
            }
        }
    }

    #[test]
    fn filters_sources_by_id_list() {
        let selected = enabled_sources(Some("denver_pd, kansas_city_pd".to_string()));
        let ids: Vec<&str> = selected.iter().map(SourceDefinition::id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"denver_pd"));
        assert!(ids.contains(&"kansas_city_pd"));

        assert!(enabled_sources(Some("nowhere_pd".to_string())).is_empty());
    }
}
