//! Shared parsing utilities for crime datasets.
//!
//! Date parsing is naive: values are read as wall-clock times with no
//! timezone conversion, so the same string always yields the same year.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use crime_trends_source_models::{CellValue, ColumnKind, is_null};

/// Date-time formats tried when a source does not configure its own.
pub const DEFAULT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only formats tried after the date-time formats.
pub const DEFAULT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parses a date or date-time string using the default formats.
///
/// RFC 3339 strings with an offset (e.g. `2015-06-21T00:00:00Z`) keep their
/// recorded wall-clock time.
#[must_use]
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DEFAULT_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DEFAULT_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Parses a date or date-time string with an explicit format list, falling
/// back to [`parse_datetime`] when `formats` is empty.
///
/// Each format is tried as a date-time first and then as a date.
#[must_use]
pub fn parse_datetime_with(s: &str, formats: &[String]) -> Option<NaiveDateTime> {
    if formats.is_empty() {
        return parse_datetime(s);
    }
    let s = s.trim();
    formats.iter().find_map(|f| {
        NaiveDateTime::parse_from_str(s, f).ok().or_else(|| {
            NaiveDate::parse_from_str(s, f)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
    })
}

/// Infers the narrowest [`ColumnKind`] that every non-null value satisfies.
pub fn infer_kind<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Empty;

    for value in values {
        if is_null(value) {
            continue;
        }
        let value = value.trim();
        kind = match kind {
            ColumnKind::Empty | ColumnKind::Integer if value.parse::<i64>().is_ok() => {
                ColumnKind::Integer
            }
            ColumnKind::Empty | ColumnKind::Integer | ColumnKind::Float
                if value.parse::<f64>().is_ok() =>
            {
                ColumnKind::Float
            }
            ColumnKind::Empty | ColumnKind::DateTime if looks_like_date(value) => {
                ColumnKind::DateTime
            }
            _ => return ColumnKind::Text,
        };
    }

    kind
}

/// Dates must contain a separator so bare numbers never count as dates.
fn looks_like_date(value: &str) -> bool {
    value.contains(['-', '/']) && parse_datetime(value).is_some()
}

/// Parses a raw cell according to its column kind.
///
/// Values that do not fit the kind fall back to [`CellValue::Text`].
#[must_use]
pub fn parse_cell(kind: ColumnKind, raw: &str) -> CellValue {
    if is_null(raw) {
        return CellValue::Null;
    }
    let value = raw.trim();
    let parsed = match kind {
        ColumnKind::Integer => value.parse().ok().map(CellValue::Integer),
        ColumnKind::Float => value.parse().ok().map(CellValue::Float),
        ColumnKind::DateTime => parse_datetime(value).map(CellValue::DateTime),
        ColumnKind::Empty | ColumnKind::Text => None,
    };
    parsed.unwrap_or_else(|| CellValue::Text(value.to_string()))
}
