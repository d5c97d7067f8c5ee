//! Recurrence rule engine.
//!
//! Expands a recurrence category into the concrete, ascending, de-duplicated
//! list of occurrence dates that fall inside a window. Pure and deterministic:
//! the same inputs always yield the same dates.

use chrono::{Datelike, NaiveDate};

use crate::fields::RecurrenceCategory;
use crate::window::{first_of_month, next_month, DateWindow};

const QUARTER_MONTHS: [u32; 4] = [1, 4, 7, 10];
const TWICE_MONTHLY_DAYS: [u32; 2] = [1, 15];

/// Generate the occurrence dates of `category` within `[start, end]`.
///
/// Every returned date `d` satisfies `start <= d <= end`, except for
/// [`RecurrenceCategory::AfterCompletion`], which always yields exactly `[end]`.
/// An empty window (`start > end`) yields no dates for any other category.
pub fn generate_occurrences(
    category: RecurrenceCategory,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let window = DateWindow::new(start, end);
    if category == RecurrenceCategory::AfterCompletion {
        return vec![end];
    }
    if window.is_empty() {
        return Vec::new();
    }

    let mut dates = match category {
        RecurrenceCategory::OneTime => vec![start],
        RecurrenceCategory::Monthly => monthly(window),
        RecurrenceCategory::TwiceMonthly => twice_monthly(window),
        RecurrenceCategory::AfterCompletion => vec![end],
        RecurrenceCategory::Quarterly
        | RecurrenceCategory::AsNeeded
        | RecurrenceCategory::Unspecified => quarterly(window),
    };
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Parse a free-text label and generate its occurrences; unknown labels run quarterly.
pub fn generate_for_label(label: &str, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    generate_occurrences(RecurrenceCategory::parse_label(label), start, end)
}

/// Walk calendar months from the month of `window.start` through `window.end`,
/// yielding the first day of each.
fn months(window: DateWindow) -> impl Iterator<Item = NaiveDate> {
    let end = window.end;
    std::iter::successors(Some(first_of_month(window.start)), |&m| next_month(m))
        .take_while(move |&m| m <= end)
}

fn monthly(window: DateWindow) -> Vec<NaiveDate> {
    months(window).filter(|&d| window.contains(d)).collect()
}

fn twice_monthly(window: DateWindow) -> Vec<NaiveDate> {
    months(window)
        .flat_map(|m| TWICE_MONTHLY_DAYS.iter().filter_map(move |&day| m.with_day(day)))
        .filter(|&d| window.contains(d))
        .collect()
}

fn quarterly(window: DateWindow) -> Vec<NaiveDate> {
    (window.start.year()..=window.end.year())
        .flat_map(|year| {
            QUARTER_MONTHS
                .iter()
                .filter_map(move |&month| NaiveDate::from_ymd_opt(year, month, 1))
        })
        .filter(|&d| window.contains(d))
        .collect()
}
