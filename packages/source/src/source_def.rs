//! Config-driven crime dataset definition.
//!
//! [`SourceDefinition`] captures everything unique about a city's dataset
//! (file name, delimiter, columns to drop, which columns hold the date and
//! the category) in a serializable config struct, so one generic pipeline
//! handles every city.

use std::path::{Path, PathBuf};

use crime_trends_source_models::{MissingColumnPolicy, Treatment};
use serde::Deserialize;

use crate::SourceError;

/// Default name of the derived year column.
pub const DEFAULT_YEAR_COLUMN: &str = "year";

// ── Top-level source definition ──────────────────────────────────────────

/// A complete, config-driven crime dataset definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"denver_pd"`).
    pub id: String,
    /// Human-readable name (e.g., `"Denver Police Department"`).
    pub name: String,
    /// City name.
    pub city: String,
    /// Two-letter state abbreviation.
    pub state: String,
    /// File name, relative to the data directory.
    pub file: String,
    /// How far through the pipeline this dataset is taken.
    #[serde(default)]
    pub treatment: Treatment,
    /// Year recreational marijuana became legal in this city, if it has.
    #[serde(default)]
    pub legalization_year: Option<i32>,
    /// Delimited-text options.
    #[serde(default)]
    pub csv: CsvOptions,
    /// Cleaning rules.
    #[serde(default)]
    pub clean: CleanRules,
    /// Which columns feed the normalizer and aggregator. Required when
    /// `treatment` is `transform`.
    #[serde(default)]
    pub fields: Option<FieldMapping>,
}

/// Delimited-text options.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvOptions {
    /// Single-character field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// Static per-city cleaning rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanRules {
    /// Whether exact duplicate rows are removed.
    #[serde(default)]
    pub deduplicate: bool,
    /// Columns removed before normalization.
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// What to do when a column in `drop_columns` is absent.
    #[serde(default)]
    pub on_missing_column: MissingColumnPolicy,
}

/// Column roles used by the normalizer and aggregator.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    /// Column holding the report/occurrence date.
    pub date: String,
    /// chrono formats for `date`, tried in order. Empty means the defaults.
    #[serde(default)]
    pub date_formats: Vec<String>,
    /// Column holding the city's crime category label.
    pub category: String,
    /// Name of the derived year column.
    #[serde(default = "default_year_column")]
    pub year: String,
    /// Optional integer column counting incidents per row (e.g. Seattle's
    /// `STAT_VALUE`).
    #[serde(default)]
    pub weight: Option<String>,
}

fn default_year_column() -> String {
    DEFAULT_YEAR_COLUMN.to_string()
}

impl SourceDefinition {
    /// Returns the unique source identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the dataset inside `data_dir`.
    #[must_use]
    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file)
    }

    /// The delimiter as a byte.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] unless the delimiter is exactly one
    /// ASCII character.
    pub fn delimiter(&self) -> Result<u8, SourceError> {
        match self.csv.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(SourceError::Config {
                message: format!(
                    "{}: delimiter must be a single ASCII character, got {:?}",
                    self.id, self.csv.delimiter
                ),
            }),
        }
    }

    /// Whether this source goes past the loader.
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        self.treatment == Treatment::Transform
    }

    /// Checks cross-field rules that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), SourceError> {
        let config_err = |message: String| Err(SourceError::Config { message });

        if self.id.is_empty() {
            return config_err("source id is empty".to_string());
        }
        if self.file.is_empty() {
            return config_err(format!("{}: no file configured", self.id));
        }
        self.delimiter()?;

        if self.is_transformed() {
            let Some(fields) = &self.fields else {
                return config_err(format!(
                    "{}: treatment is transform but no [fields] table is configured",
                    self.id
                ));
            };
            for column in [&fields.date, &fields.category] {
                if self.clean.drop_columns.contains(column) {
                    return config_err(format!(
                        "{}: column {column:?} is both dropped and required",
                        self.id
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Parses and validates a [`SourceDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the TOML is malformed, missing required
/// fields, or fails [`SourceDefinition::validate`].
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, SourceError> {
    let def: SourceDefinition = toml::de::from_str(toml_str).map_err(|e| SourceError::Config {
        message: e.to_string(),
    })?;
    def.validate()?;
    Ok(def)
}
