//! Source registry: loads all dataset definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/sources/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new city is as simple as
//! creating a new TOML file and adding it to the list below.

use crate::source_def::{SourceDefinition, parse_source_toml};

/// TOML configs embedded at compile time.
const SOURCE_TOMLS: &[(&str, &str)] = &[
    // ── Legalized 2012 ───────────────────────────────────────────────
    ("denver", include_str!("../sources/denver.toml")),
    (
        "seattle_current",
        include_str!("../sources/seattle_current.toml"),
    ),
    (
        "seattle_legacy",
        include_str!("../sources/seattle_legacy.toml"),
    ),
    // ── Comparison city ──────────────────────────────────────────────
    ("kansas_city", include_str!("../sources/kansas_city.toml")),
];

/// Total number of configured sources (used in tests).
#[cfg(test)]
const EXPECTED_SOURCE_COUNT: usize = 4;

/// Returns all configured source definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    SOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_source_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Returns the source with the given id.
#[must_use]
pub fn find_source(id: &str) -> Option<SourceDefinition> {
    all_sources().into_iter().find(|s| s.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_sources() {
        let sources = all_sources();
        assert_eq!(sources.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn source_ids_are_unique() {
        let sources = all_sources();
        let mut ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), EXPECTED_SOURCE_COUNT);
    }

    #[test]
    fn transformed_sources_have_fields() {
        for source in &all_sources() {
            assert!(!source.name.is_empty(), "source name is empty");
            assert!(!source.city.is_empty(), "source city is empty");
            assert_eq!(source.state.len(), 2, "{}: bad state", source.id);
            if source.is_transformed() {
                assert!(source.fields.is_some(), "{}: no fields", source.id);
            }
        }
    }

    #[test]
    fn finds_sources_by_id() {
        assert_eq!(find_source("seattle_pd").unwrap().city, "Seattle");
        assert!(find_source("chicago_pd").is_none());
    }
}
