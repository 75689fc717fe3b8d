//! Before/after comparison around a pivot year.

use crime_trends_analytics_models::{CategoryChange, CategoryYearTally, PeriodComparison};

use crate::AnalyticsError;

/// Number of years on each side of the pivot when none is given.
pub const DEFAULT_WINDOW: u32 = 3;

/// Label used for the all-categories row.
pub const OVERALL_LABEL: &str = "ALL";

/// Compares each category's total over `[pivot - window, pivot - 1]` with
/// its total over `[pivot + 1, pivot + window]`.
///
/// The pivot year itself is excluded from both windows since the change
/// takes effect part-way through it.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidArgument`] if `window` is zero or the
/// windows would overflow the year range.
pub fn compare_periods(
    tally: &CategoryYearTally,
    pivot_year: i32,
    window: u32,
) -> Result<PeriodComparison, AnalyticsError> {
    let span = i32::try_from(window)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| AnalyticsError::InvalidArgument {
            message: format!("window must be between 1 and {}, got {window}", i32::MAX),
        })?;

    let before_years = pivot_year
        .checked_sub(span)
        .map(|first| (first, pivot_year - 1));
    let after_years = pivot_year
        .checked_add(span)
        .map(|last| (pivot_year + 1, last));
    let (Some(before_years), Some(after_years)) = (before_years, after_years) else {
        return Err(AnalyticsError::InvalidArgument {
            message: format!("window {window} around {pivot_year} overflows the year range"),
        });
    };

    let in_range = |year: i32, (first, last): (i32, i32)| (first..=last).contains(&year);

    let by_category: Vec<CategoryChange> = tally
        .categories()
        .into_iter()
        .map(|category| {
            let (before, after) = tally
                .iter()
                .filter(|(_, c, _)| *c == category)
                .fold((0, 0), |(before, after), (year, _, count)| {
                    if in_range(year, before_years) {
                        (before + count, after)
                    } else if in_range(year, after_years) {
                        (before, after + count)
                    } else {
                        (before, after)
                    }
                });
            change(category, before, after)
        })
        .collect();

    let before_total = by_category.iter().map(|c| c.before).sum();
    let after_total = by_category.iter().map(|c| c.after).sum();

    log::debug!(
        "Compared {before_years:?} with {after_years:?} across {} categories",
        by_category.len()
    );

    Ok(PeriodComparison {
        pivot_year,
        window,
        before_years,
        after_years,
        overall: change(OVERALL_LABEL, before_total, after_total),
        by_category,
    })
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
fn change(category: &str, before: u64, after: u64) -> CategoryChange {
    let percent_change = if before == 0 {
        None
    } else {
        Some((after as f64 - before as f64) / before as f64 * 100.0)
    };
    CategoryChange {
        category: category.to_string(),
        before,
        after,
        change: after as i64 - before as i64,
        percent_change,
    }
}
