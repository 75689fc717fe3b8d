#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the crime trends toolchain.
//!
//! Provides `indicatif`-backed progress bars behind the [`StageProgress`]
//! trait, plus [`init_logger`] which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while progress bars redraw.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crime_trends_source::progress::StageProgress;
use crime_trends_source_models::Stage;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// One overall "sources N/M" bar plus a spinner per city showing its
/// current stage.
pub struct IndicatifStageProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    spinners: Mutex<BTreeMap<String, ProgressBar>>,
}

impl IndicatifStageProgress {
    /// Creates the overall bar for `total` sources. City spinners are added
    /// as each source starts.
    #[must_use]
    pub fn sources_bar(multi: &MultiProgress, total: u64) -> Arc<dyn StageProgress> {
        let overall = multi.add(ProgressBar::new(total));
        overall.set_style(
            ProgressStyle::with_template(
                "{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        overall.set_message("Sources");

        Arc::new(Self {
            multi: multi.clone(),
            overall,
            spinners: Mutex::new(BTreeMap::new()),
        })
    }

    fn with_spinner(&self, source_id: &str, f: impl FnOnce(&ProgressBar)) {
        if let Ok(spinners) = self.spinners.lock()
            && let Some(bar) = spinners.get(source_id)
        {
            f(bar);
        }
    }
}

impl StageProgress for IndicatifStageProgress {
    fn source_started(&self, source_id: &str) {
        let bar = self.multi.insert_before(&self.overall, ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(source_id.to_string());
        bar.set_message("loading");

        if let Ok(mut spinners) = self.spinners.lock() {
            spinners.insert(source_id.to_string(), bar);
        }
    }

    fn stage_finished(&self, source_id: &str, stage: Stage, rows: usize) {
        self.with_spinner(source_id, |bar| {
            bar.set_message(format!("{stage} done ({rows} rows)"));
        });
    }

    fn source_finished(&self, source_id: &str, succeeded: bool) {
        self.with_spinner(source_id, |bar| {
            let status = if succeeded { "done" } else { "failed" };
            bar.finish_with_message(status);
        });
        self.overall.inc(1);
        if self.overall.length() == Some(self.overall.position()) {
            self.overall.finish();
        }
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Already set in tests

    log::set_max_level(level);

    multi
}
