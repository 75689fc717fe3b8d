//! Progress reporting trait for the per-city pipeline.
//!
//! Defines a [`StageProgress`] trait that decouples progress reporting
//! from any specific rendering backend (e.g., `indicatif` progress bars or
//! silence). Implementations are provided upstream in crates that choose a
//! rendering strategy.

use crime_trends_source_models::Stage;

/// Receives stage-level events while sources are processed.
///
/// Implementations must be `Send + Sync` because cities are processed on
/// separate blocking tasks.
pub trait StageProgress: Send + Sync {
    /// A source has started loading.
    fn source_started(&self, source_id: &str);

    /// A stage finished for a source, leaving `rows` rows.
    fn stage_finished(&self, source_id: &str, stage: Stage, rows: usize);

    /// A source finished, successfully or not.
    fn source_finished(&self, source_id: &str, succeeded: bool);
}

/// A no-op implementation of [`StageProgress`].
///
/// Useful for tests and non-interactive output.
pub struct NullProgress;

impl StageProgress for NullProgress {
    fn source_started(&self, _source_id: &str) {}
    fn stage_finished(&self, _source_id: &str, _stage: Stage, _rows: usize) {}
    fn source_finished(&self, _source_id: &str, _succeeded: bool) {}
}
