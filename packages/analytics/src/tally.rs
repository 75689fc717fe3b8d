//! Year/category tallying.

use std::collections::BTreeMap;

use crime_trends_analytics_models::{CategoryCount, CategoryYearTally, YearCategoryMatrix};
use crime_trends_source_models::Table;

use crate::{AnalyticsError, column_index};

/// Counts rows per `(year, category)`.
///
/// Rows with a null or non-integer year, or a null category, are left out
/// and reported through [`CategoryYearTally::excluded_rows`]. The sum of
/// the counts therefore equals the number of rows with both a valid year
/// and a category.
///
/// # Errors
///
/// Returns [`AnalyticsError::ColumnNotFound`] if either column is missing.
pub fn tally_by_year_and_category(
    table: &Table,
    year_column: &str,
    category_column: &str,
) -> Result<CategoryYearTally, AnalyticsError> {
    let year_idx = column_index(table, year_column)?;
    let category_idx = column_index(table, category_column)?;
    Ok(tally_rows(table, year_idx, category_idx, |_| Some(1)))
}

/// Sums `weight_column` per `(year, category)` instead of counting rows.
///
/// Rows whose weight is null or not a non-negative integer are left out
/// along with rows lacking a year or category.
///
/// # Errors
///
/// Returns [`AnalyticsError::ColumnNotFound`] if any column is missing.
pub fn weighted_tally(
    table: &Table,
    year_column: &str,
    category_column: &str,
    weight_column: &str,
) -> Result<CategoryYearTally, AnalyticsError> {
    let year_idx = column_index(table, year_column)?;
    let category_idx = column_index(table, category_column)?;
    let weight_idx = column_index(table, weight_column)?;
    Ok(tally_rows(table, year_idx, category_idx, |row| {
        table.cell(row, weight_idx)?.trim().parse::<u64>().ok()
    }))
}

fn tally_rows(
    table: &Table,
    year_idx: usize,
    category_idx: usize,
    weight: impl Fn(usize) -> Option<u64>,
) -> CategoryYearTally {
    let mut counts: BTreeMap<(i32, String), u64> = BTreeMap::new();
    let mut excluded = 0;

    for row in 0..table.row_count() {
        let year = table
            .cell(row, year_idx)
            .and_then(|y| y.trim().parse::<i32>().ok());
        let category = table.cell(row, category_idx);

        match (year, category, weight(row)) {
            (Some(year), Some(category), Some(w)) => {
                *counts.entry((year, category.to_string())).or_insert(0) += w;
            }
            _ => excluded += 1,
        }
    }

    if excluded > 0 {
        log::warn!(
            "{excluded} of {} rows excluded from the tally (missing year, category or weight)",
            table.row_count()
        );
    }

    CategoryYearTally::from_counts(counts, excluded)
}

/// Frequency of each value in `column`, most common first (ties broken by
/// label). Nulls are not counted.
///
/// # Errors
///
/// Returns [`AnalyticsError::ColumnNotFound`] if the column is missing.
pub fn category_counts(table: &Table, column: &str) -> Result<Vec<CategoryCount>, AnalyticsError> {
    let idx = column_index(table, column)?;

    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for value in table.column_values(idx).flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut result: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    // Stable sort keeps the BTreeMap's label order among equal counts.
    result.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(result)
}

/// Expands a tally into a dense year x category grid, filling absent pairs
/// with zero.
#[must_use]
pub fn year_category_matrix(tally: &CategoryYearTally) -> YearCategoryMatrix {
    let years: Vec<i32> = tally.years().into_iter().collect();
    let categories: Vec<String> = tally
        .categories()
        .into_iter()
        .map(String::from)
        .collect();

    let counts = years
        .iter()
        .map(|&year| {
            categories
                .iter()
                .map(|category| tally.get(year, category).unwrap_or(0))
                .collect()
        })
        .collect();

    YearCategoryMatrix {
        years,
        categories,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use crime_trends_source::loader::read_table;
    use crime_trends_source_models::{Column, ColumnKind};

    use super::*;

    fn table(rows: &[(&str, &str)]) -> Table {
        Table::new(
            vec![
                Column::new("year", ColumnKind::Integer),
                Column::new("category", ColumnKind::Text),
            ],
            rows.iter()
                .map(|(y, c)| vec![(*y).to_string(), (*c).to_string()])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn tallies_the_five_row_example_exactly() {
        let input = table(&[
            ("2013", "A"),
            ("2013", "A"),
            ("2014", "B"),
            ("2013", "A"),
            ("2014", "B"),
        ]);
        let tally = tally_by_year_and_category(&input, "year", "category").unwrap();
        let expected = CategoryYearTally::from_counts(
            BTreeMap::from([((2013, "A".to_string()), 3), ((2014, "B".to_string()), 2)]),
            0,
        );
        assert_eq!(tally, expected);
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn total_equals_rows_with_year_and_category() {
        let input = table(&[
            ("2013", "A"),
            ("", "A"),
            ("2014", ""),
            ("unknown", "B"),
            ("2014", "B"),
            ("2015", "a"),
        ]);
        let tally = tally_by_year_and_category(&input, "year", "category").unwrap();
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.excluded_rows(), 3);
        assert_eq!(tally.total() as usize + tally.excluded_rows(), input.row_count());
    }

    #[test]
    fn labels_are_not_normalized() {
        let input = table(&[("2013", "Theft"), ("2013", "theft"), ("2013", "Theft ")]);
        let tally = tally_by_year_and_category(&input, "year", "category").unwrap();
        assert_eq!(tally.len(), 3);
        assert_eq!(tally.get(2013, "Theft"), Some(1));
        assert_eq!(tally.get(2013, "theft"), Some(1));
        assert_eq!(tally.get(2013, "Theft "), Some(1));
    }

    #[test]
    fn loaded_labels_keep_padding_and_case() {
        let data = "year,category\n2013,Theft\n2013,Theft \n2013, Theft\n2013,theft\n2013,Theft\n";
        let input = read_table(data.as_bytes(), b',', "padded").unwrap();
        let tally = tally_by_year_and_category(&input, "year", "category").unwrap();
        assert_eq!(tally.len(), 4);
        assert_eq!(tally.get(2013, "Theft"), Some(2));
        assert_eq!(tally.get(2013, "Theft "), Some(1));
        assert_eq!(tally.get(2013, " Theft"), Some(1));
        assert_eq!(tally.get(2013, "theft"), Some(1));
        assert_eq!(tally.total(), 5);
    }

    #[test]
    fn missing_columns_are_reported() {
        let input = table(&[("2013", "A")]);
        let err = tally_by_year_and_category(&input, "year", "CRIME_TYPE").unwrap_err();
        assert!(
            matches!(err, AnalyticsError::ColumnNotFound { ref column, .. } if column == "CRIME_TYPE")
        );
    }

    #[test]
    fn weighted_tally_sums_the_weight_column() {
        let input = Table::new(
            vec![
                Column::new("year", ColumnKind::Integer),
                Column::new("CRIME_TYPE", ColumnKind::Text),
                Column::new("STAT_VALUE", ColumnKind::Integer),
            ],
            vec![
                vec!["2013".into(), "Robbery".into(), "4".into()],
                vec!["2013".into(), "Robbery".into(), "6".into()],
                vec!["2014".into(), "Robbery".into(), String::new()],
                vec!["2014".into(), "Robbery".into(), "-1".into()],
            ],
        )
        .unwrap();
        let tally = weighted_tally(&input, "year", "CRIME_TYPE", "STAT_VALUE").unwrap();
        assert_eq!(tally.get(2013, "Robbery"), Some(10));
        assert_eq!(tally.get(2014, "Robbery"), None);
        assert_eq!(tally.excluded_rows(), 2);
    }

    #[test]
    fn counts_categories_most_common_first() {
        let input = table(&[
            ("2013", "B"),
            ("2013", "A"),
            ("2014", "C"),
            ("2014", "C"),
            ("2014", ""),
        ]);
        let counts = category_counts(&input, "category").unwrap();
        let flat: Vec<(&str, u64)> = counts.iter().map(|c| (c.category.as_str(), c.count)).collect();
        assert_eq!(flat, vec![("C", 2), ("A", 1), ("B", 1)]);
    }

    #[test]
    fn matrix_zero_fills_absent_pairs() {
        let input = table(&[("2013", "A"), ("2013", "A"), ("2014", "B")]);
        let tally = tally_by_year_and_category(&input, "year", "category").unwrap();
        let matrix = year_category_matrix(&tally);
        assert_eq!(matrix.years, vec![2013, 2014]);
        assert_eq!(matrix.categories, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(matrix.counts, vec![vec![2, 0], vec![0, 1]]);
    }
}
