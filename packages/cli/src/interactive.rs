//! Interactive menu for the crime trends tool.
//!
//! Provides a menu-driven interface using `dialoguer` for running the
//! pipeline without memorizing CLI flags.

use std::path::Path;

use crime_trends_analytics::compare::DEFAULT_WINDOW;
use crime_trends_cli_utils::MultiProgress;
use crime_trends_pipeline::{RunOptions, all_sources};
use crime_trends_source::source_def::SourceDefinition;
use dialoguer::{Confirm, Input, MultiSelect, Select};

use crate::commands;
use crate::render::OutputFormat;

/// Top-level actions available in the interactive menu.
enum Action {
    RunSources,
    Tally,
    Compare,
    Profile,
    ListSources,
}

impl Action {
    const ALL: &[Self] = &[
        Self::RunSources,
        Self::Tally,
        Self::Compare,
        Self::Profile,
        Self::ListSources,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunSources => "Run pipeline for selected cities",
            Self::Tally => "Tally one city by year and category",
            Self::Compare => "Compare before/after legalization",
            Self::Profile => "Profile a raw dataset",
            Self::ListSources => "List sources",
        }
    }
}

fn source_label(source: &SourceDefinition) -> String {
    format!("{} \u{2014} {}", source.id(), source.name())
}

/// Prompts for a single source among `sources`.
fn select_source<'a>(
    prompt: &str,
    sources: &'a [SourceDefinition],
) -> Result<&'a SourceDefinition, Box<dyn std::error::Error>> {
    let labels: Vec<String> = sources.iter().map(source_label).collect();
    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(&sources[idx])
}

fn prompt_optional_i32(
    prompt: &str,
    default: Option<i32>,
) -> Result<Option<i32>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .default(default.map(|y| y.to_string()).unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.trim().parse()?))
    }
}

/// Runs the interactive menu, prompting the user to select and configure
/// an action.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub async fn run(
    data_dir: &Path,
    format: OutputFormat,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = all_sources();
    if sources.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }
    let transformed: Vec<SourceDefinition> = sources
        .iter()
        .filter(|s| s.is_transformed())
        .cloned()
        .collect();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::RunSources => {
            let labels: Vec<String> = sources.iter().map(source_label).collect();
            let defaults = vec![true; labels.len()];
            let selected = MultiSelect::new()
                .with_prompt("Select cities (space=toggle, a=all, enter=confirm)")
                .items(&labels)
                .defaults(&defaults)
                .interact()?;

            if selected.is_empty() {
                println!("No sources selected.");
                return Ok(());
            }

            let chosen: Vec<SourceDefinition> =
                selected.into_iter().map(|i| sources[i].clone()).collect();
            commands::run(
                chosen,
                data_dir.to_path_buf(),
                RunOptions::default(),
                format,
                None,
                multi,
            )
            .await?;
        }
        Action::Tally => {
            let def = select_source("City to tally", &transformed)?;
            let weighted = def.fields.as_ref().is_some_and(|f| f.weight.is_some())
                && Confirm::new()
                    .with_prompt("Sum the weight column instead of counting rows?")
                    .default(false)
                    .interact()?;
            commands::tally(def.id(), data_dir, weighted, format)?;
        }
        Action::Compare => {
            let def = select_source("City to compare", &transformed)?;
            let pivot_year = prompt_optional_i32("Pivot year", def.legalization_year)?;
            let window: u32 = Input::new()
                .with_prompt("Years on each side")
                .default(DEFAULT_WINDOW)
                .interact_text()?;
            let options = RunOptions { window, pivot_year };
            commands::compare(def.id(), data_dir, &options, format)?;
        }
        Action::Profile => {
            let def = select_source("Dataset to profile", &sources)?;
            commands::profile(def.id(), data_dir, format)?;
        }
        Action::ListSources => commands::list_sources(&sources),
    }

    Ok(())
}
