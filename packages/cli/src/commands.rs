//! Subcommand handlers, shared by the clap front end and the interactive
//! menu.

use std::path::{Path, PathBuf};

use crime_trends_analytics::profile::{describe_numeric, profile_table};
use crime_trends_analytics_models::CategoryYearTally;
use crime_trends_cli_utils::{IndicatifStageProgress, MultiProgress};
use crime_trends_pipeline::{CityAnalysis, RunOptions, run_all_concurrent, run_source};
use crime_trends_source::loader::load_table;
use crime_trends_source::progress::NullProgress;
use crime_trends_source::registry::find_source;
use crime_trends_source::source_def::SourceDefinition;

use crate::render::{self, OutputFormat};

fn lookup(source_id: &str) -> Result<SourceDefinition, Box<dyn std::error::Error>> {
    find_source(source_id).ok_or_else(|| format!("Unknown source: {source_id}").into())
}

fn analyze(
    def: &SourceDefinition,
    data_dir: &Path,
    options: &RunOptions,
) -> Result<CityAnalysis, Box<dyn std::error::Error>> {
    let report = run_source(def, data_dir, options, &NullProgress)?;
    report
        .analysis
        .ok_or_else(|| format!("{} is load-only; it has no tally", def.id()).into())
}

/// Prints every configured source.
pub fn list_sources(sources: &[SourceDefinition]) {
    println!("{}", render::sources_text(sources));
}

/// Loads a source without transforming it and prints its profile.
///
/// # Errors
///
/// Returns an error if the source is unknown or its file cannot be loaded.
pub fn profile(
    source_id: &str,
    data_dir: &Path,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let def = lookup(source_id)?;
    let table = load_table(&def.path_in(data_dir), def.delimiter()?)?;
    let profile = profile_table(&table);
    let numeric = describe_numeric(&table);

    let rendered = match format {
        OutputFormat::Text => render::profile_text(def.name(), &profile, &numeric),
        OutputFormat::Json => render::profile_json(&profile, &numeric)?,
    };
    println!("{rendered}");
    Ok(())
}

/// Runs one source through the pipeline and prints its tally.
///
/// # Errors
///
/// Returns an error if the source is unknown, load-only, has no weight
/// column when `weighted` is set, or any stage fails.
pub fn tally(
    source_id: &str,
    data_dir: &Path,
    weighted: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let def = lookup(source_id)?;
    let analysis = analyze(&def, data_dir, &RunOptions::default())?;

    let tally: CategoryYearTally = if weighted {
        analysis
            .weighted
            .ok_or_else(|| format!("{source_id} has no weight column configured"))?
    } else {
        analysis.tally
    };

    let rendered = match format {
        OutputFormat::Text => render::tally_text(&tally),
        OutputFormat::Json => render::tally_json(&tally)?,
    };
    println!("{rendered}");
    Ok(())
}

/// Runs one source and prints the before/after comparison.
///
/// # Errors
///
/// Returns an error if the source is unknown, load-only, has no pivot year
/// (configured or given), or any stage fails.
pub fn compare(
    source_id: &str,
    data_dir: &Path,
    options: &RunOptions,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let def = lookup(source_id)?;
    let comparison = analyze(&def, data_dir, options)?
        .comparison
        .ok_or_else(|| {
            format!("{source_id} has no legalization year configured; pass --pivot-year")
        })?;

    let rendered = match format {
        OutputFormat::Text => render::comparison_text(&comparison),
        OutputFormat::Json => serde_json::to_string_pretty(&comparison)?,
    };
    println!("{rendered}");
    Ok(())
}

/// Runs every given source concurrently and prints each city's report.
///
/// Every outcome is printed (and written to `out`) before failures are
/// reported.
///
/// # Errors
///
/// Returns an error if no sources were given, the report cannot be written,
/// or any source failed.
pub async fn run(
    sources: Vec<SourceDefinition>,
    data_dir: PathBuf,
    options: RunOptions,
    format: OutputFormat,
    out: Option<&Path>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    if sources.is_empty() {
        return Err("No sources selected".into());
    }

    log::info!(
        "Running {} source(s): {}",
        sources.len(),
        sources
            .iter()
            .map(SourceDefinition::id)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let total = u64::try_from(sources.len()).unwrap_or(u64::MAX);
    let progress = IndicatifStageProgress::sources_bar(multi, total);
    let outcomes = run_all_concurrent(sources, data_dir, options, progress).await;

    let rendered = match format {
        OutputFormat::Text => render::outcomes_text(&outcomes),
        OutputFormat::Json => render::outcomes_json(&outcomes)?,
    };
    println!("{rendered}");

    if let Some(path) = out {
        std::fs::write(path, &rendered)?;
        log::info!("Report written to {}", path.display());
    }

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .map(|o| o.source_id.as_str())
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} source(s) failed: {}", failed.len(), failed.join(", ")).into())
    }
}
