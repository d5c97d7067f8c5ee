//! Project date window and calendar helpers.
//!
//! Every generated occurrence is bounded by a window. A task may carry its own
//! start and end dates; whichever is missing falls back to the project window.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default project start when no configuration overrides it.
pub const DEFAULT_PROJECT_START: (i32, u32, u32) = (2024, 1, 1);
/// Default project end when no configuration overrides it.
pub const DEFAULT_PROJECT_END: (i32, u32, u32) = (2026, 12, 31);

/// An inclusive `[start, end]` date interval. Empty when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    /// The built-in project window.
    pub fn project_default() -> Self {
        let (sy, sm, sd) = DEFAULT_PROJECT_START;
        let (ey, em, ed) = DEFAULT_PROJECT_END;
        DateWindow {
            start: NaiveDate::from_ymd_opt(sy, sm, sd).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(ey, em, ed).unwrap_or(NaiveDate::MAX),
        }
    }

    /// Window to schedule a task against: each missing bound falls back to the project's.
    pub fn effective(
        task_start: Option<NaiveDate>,
        task_end: Option<NaiveDate>,
        project: DateWindow,
    ) -> Self {
        DateWindow {
            start: task_start.unwrap_or(project.start),
            end: task_end.unwrap_or(project.end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }
}

/// First day of the month containing `d`.
pub fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

/// First day of the calendar month after the one containing `d`.
///
/// Returns `None` only past the end of chrono's representable range.
pub fn next_month(d: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parse a date as found in source tables.
///
/// Accepts ISO `YYYY-MM-DD` as well as the dotted `D.M.YYYY` form, with or
/// without spaces after the dots.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    NaiveDate::parse_from_str(compact.trim_end_matches('.'), "%d.%m.%Y").ok()
}

/// Format a date the way generated titles show it (`DD.MM.YYYY`).
pub fn format_date(d: NaiveDate) -> String {
    d.format("%d.%m.%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_effective_window_fallbacks() {
        let project = DateWindow::new(date(2024, 1, 1), date(2026, 12, 31));

        let w = DateWindow::effective(None, None, project);
        assert_eq!(w, project);

        let w = DateWindow::effective(Some(date(2025, 3, 1)), None, project);
        assert_eq!(w.start, date(2025, 3, 1));
        assert_eq!(w.end, date(2026, 12, 31));

        let w = DateWindow::effective(None, Some(date(2024, 6, 30)), project);
        assert_eq!(w.start, date(2024, 1, 1));
        assert_eq!(w.end, date(2024, 6, 30));
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let project = DateWindow::project_default();
        let w = DateWindow::effective(Some(date(2027, 1, 1)), None, project);
        assert!(w.is_empty());
        assert!(!w.contains(date(2027, 1, 1)));
    }

    #[test]
    fn test_next_month_rolls_year() {
        assert_eq!(next_month(date(2024, 12, 31)), Some(date(2025, 1, 1)));
        assert_eq!(next_month(date(2024, 1, 31)), Some(date(2024, 2, 1)));
        assert_eq!(first_of_month(date(2024, 2, 29)), date(2024, 2, 1));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-03-15"), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("15.3.2025"), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("15. 03. 2025"), Some(date(2025, 3, 15)));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("soon"), None);
        assert_eq!(format_date(date(2025, 3, 5)), "05.03.2025");
    }
}
