#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the crime trends pipeline.
//!
//! Loads each city's incident file, cleans it, tags every row with a year
//! and tallies incidents by year and category. With no subcommand an
//! interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`crime_trends_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod interactive;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crime_trends_analytics::compare::DEFAULT_WINDOW;
use crime_trends_pipeline::{RunOptions, all_sources, enabled_sources};

use crate::render::OutputFormat;

#[derive(Parser)]
#[command(
    name = "crime_trends",
    about = "Year-by-category crime tallies for cities around marijuana legalization"
)]
struct Cli {
    /// Directory containing the city CSV files
    #[arg(
        long,
        global = true,
        env = "CRIME_TRENDS_DATA_DIR",
        default_value = "data"
    )]
    data_dir: PathBuf,

    /// Output format: `text` or `json`
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured data sources
    Sources,
    /// Load a dataset and print its shape, null counts and numeric summary
    Profile {
        /// Source identifier (e.g., "`kansas_city_pd`")
        source: String,
    },
    /// Run a source through the pipeline and print its year/category tally
    Tally {
        /// Source identifier (e.g., "`denver_pd`")
        source: String,
        /// Sum the configured weight column instead of counting rows
        #[arg(long)]
        weighted: bool,
    },
    /// Compare category totals before and after the legalization year
    Compare {
        /// Source identifier (e.g., "`seattle_pd`")
        source: String,
        /// Pivot year (defaults to the source's legalization year)
        #[arg(long)]
        pivot_year: Option<i32>,
        /// Number of years on each side of the pivot
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: u32,
    },
    /// Run every enabled source and print each city's report
    Run {
        /// Comma-separated list of source IDs to run (overrides `CRIME_TRENDS_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
        /// Also write the rendered report to this file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Pivot year override for every source
        #[arg(long)]
        pivot_year: Option<i32>,
        /// Number of years on each side of the pivot
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_trends_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Crime Trends");
        println!();
        return interactive::run(&cli.data_dir, cli.format, &multi).await;
    };

    match command {
        Commands::Sources => commands::list_sources(&all_sources()),
        Commands::Profile { source } => commands::profile(&source, &cli.data_dir, cli.format)?,
        Commands::Tally { source, weighted } => {
            commands::tally(&source, &cli.data_dir, weighted, cli.format)?;
        }
        Commands::Compare {
            source,
            pivot_year,
            window,
        } => {
            let options = RunOptions { window, pivot_year };
            commands::compare(&source, &cli.data_dir, &options, cli.format)?;
        }
        Commands::Run {
            sources,
            out,
            pivot_year,
            window,
        } => {
            let options = RunOptions { window, pivot_year };
            commands::run(
                enabled_sources(sources),
                cli.data_dir,
                options,
                cli.format,
                out.as_deref(),
                &multi,
            )
            .await?;
        }
    }

    Ok(())
}
