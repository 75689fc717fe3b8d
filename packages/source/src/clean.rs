//! Row de-duplication and column removal.

use std::collections::{BTreeSet, HashSet};

use crime_trends_source_models::{MissingColumnPolicy, Table, is_null};

use crate::SourceError;

/// Result of [`deduplicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated {
    /// The table with repeated rows removed.
    pub table: Table,
    /// How many rows were removed.
    pub removed: usize,
}

/// Comparison key for a row: exact cell text, with every null marker
/// treated as the same missing value.
fn row_key(row: &[String]) -> Vec<Option<&str>> {
    row.iter()
        .map(|cell| Some(cell.as_str()).filter(|c| !is_null(c)))
        .collect()
}

/// Removes rows that exactly match an earlier row across every column.
///
/// Cells compare by exact text, except that all null markers (see
/// [`crime_trends_source_models::NULL_MARKERS`]) are equal to each other.
/// The first occurrence is kept and surviving rows keep their relative
/// order, so applying this twice is the same as applying it once.
#[must_use]
pub fn deduplicate(table: &Table) -> Deduplicated {
    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(table.row_count());
    let deduplicated = table.filter_rows(|row| seen.insert(row_key(row)));

    let removed = table.row_count() - deduplicated.row_count();
    if removed > 0 {
        log::info!("Removed {removed} duplicate rows");
    }

    Deduplicated {
        table: deduplicated,
        removed,
    }
}

/// Counts the rows that [`deduplicate`] would remove.
#[must_use]
pub fn count_duplicates(table: &Table) -> usize {
    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(table.row_count());
    table
        .rows()
        .iter()
        .filter(|row| !seen.insert(row_key(row)))
        .count()
}

/// Removes the named columns, keeping the remaining columns' content and
/// relative order.
///
/// # Errors
///
/// With [`MissingColumnPolicy::Fail`], returns
/// [`SourceError::ColumnNotFound`] for the first name that is not a column
/// of `table`.
pub fn drop_columns<S: AsRef<str>>(
    table: &Table,
    names: &[S],
    policy: MissingColumnPolicy,
) -> Result<Table, SourceError> {
    let mut drop: BTreeSet<usize> = BTreeSet::new();

    for name in names {
        let name = name.as_ref();
        match (table.column_index(name), policy) {
            (Some(idx), _) => {
                drop.insert(idx);
            }
            (None, MissingColumnPolicy::Fail) => {
                return Err(SourceError::column_not_found(name, table));
            }
            (None, MissingColumnPolicy::Ignore) => {
                log::warn!("Column {name:?} not present, nothing to drop");
            }
        }
    }

    let keep: Vec<usize> = (0..table.column_count())
        .filter(|i| !drop.contains(i))
        .collect();

    log::debug!(
        "Dropped {} of {} columns",
        drop.len(),
        table.column_count()
    );

    Ok(table.select_columns(&keep))
}

#[cfg(test)]
mod tests {
    use crime_trends_source_models::{Column, ColumnKind};

    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(
            vec![
                Column::new("CRIME_TYPE", ColumnKind::Text),
                Column::new("REPORT_DATE", ColumnKind::DateTime),
                Column::new("Precinct", ColumnKind::Text),
            ],
            rows.iter()
                .map(|r| r.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn seattle_with_four_duplicates() -> Table {
        table(&[
            &["Homicide", "2014-01-01T00:00:00", "E"],
            &["Rape", "2014-01-01T00:00:00", "N"],
            &["Homicide", "2014-01-01T00:00:00", "E"],
            &["Robbery", "2015-01-01T00:00:00", "SW"],
            &["Rape", "2014-01-01T00:00:00", "N"],
            &["Robbery", "2015-01-01T00:00:00", "SW"],
            &["Homicide", "2014-01-01T00:00:00", "E"],
            &["Assault", "2015-01-01T00:00:00", "W"],
        ])
    }

    #[test]
    fn removes_exactly_the_repeated_rows() {
        let input = seattle_with_four_duplicates();
        let result = deduplicate(&input);
        assert_eq!(result.removed, 4);
        assert_eq!(result.table.row_count(), input.row_count() - 4);
        assert_eq!(count_duplicates(&input), 4);
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let result = deduplicate(&seattle_with_four_duplicates());
        let types: Vec<&str> = result
            .table
            .column_values(0)
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(types, vec!["Homicide", "Rape", "Robbery", "Assault"]);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let once = deduplicate(&seattle_with_four_duplicates());
        let twice = deduplicate(&once.table);
        assert_eq!(twice.table, once.table);
        assert_eq!(twice.removed, 0);
        assert_eq!(count_duplicates(&once.table), 0);
    }

    #[test]
    fn null_markers_compare_equal() {
        let input = table(&[
            &["Homicide", "2014-01-01T00:00:00", ""],
            &["Homicide", "2014-01-01T00:00:00", "NA"],
            &["Homicide", "2014-01-01T00:00:00", "N"],
        ]);
        let result = deduplicate(&input);
        assert_eq!(result.removed, 1);
        assert_eq!(count_duplicates(&input), 1);
        assert_eq!(result.table.row_count(), 2);
    }

    #[test]
    fn rows_differing_only_in_padding_or_case_are_kept() {
        let input = table(&[
            &["Robbery", "2014-01-01T00:00:00", "E"],
            &["Robbery ", "2014-01-01T00:00:00", "E"],
            &["robbery", "2014-01-01T00:00:00", "E"],
        ]);
        assert_eq!(deduplicate(&input).removed, 0);
    }

    #[test]
    fn rows_differing_in_one_column_are_kept() {
        let input = table(&[
            &["Homicide", "2014-01-01T00:00:00", "E"],
            &["Homicide", "2014-01-01T00:00:00", "N"],
        ]);
        assert_eq!(deduplicate(&input).removed, 0);
    }

    #[test]
    fn drops_named_columns_and_preserves_the_rest() {
        let input = seattle_with_four_duplicates();
        let out = drop_columns(&input, &["REPORT_DATE"], MissingColumnPolicy::Fail).unwrap();
        assert_eq!(out.column_names(), vec!["CRIME_TYPE", "Precinct"]);
        assert_eq!(out.row_count(), input.row_count());
        for (before, after) in input.rows().iter().zip(out.rows()) {
            assert_eq!(after, &vec![before[0].clone(), before[2].clone()]);
        }
    }

    #[test]
    fn missing_column_fails_by_default() {
        let input = seattle_with_four_duplicates();
        let err = drop_columns(&input, &["Sector"], MissingColumnPolicy::Fail).unwrap_err();
        match err {
            SourceError::ColumnNotFound { column, available } => {
                assert_eq!(column, "Sector");
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_column_can_be_ignored() {
        let input = seattle_with_four_duplicates();
        let out = drop_columns(
            &input,
            &["Sector", "Precinct"],
            MissingColumnPolicy::Ignore,
        )
        .unwrap();
        assert_eq!(out.column_names(), vec!["CRIME_TYPE", "REPORT_DATE"]);
    }
}
