//! Civil dates and day-count arithmetic.

use std::fmt;

use chrono::{Datelike, Days as ChronoDays, NaiveDate};

use crate::error::FactGraphError;

/// A civil date (year-month-day), no timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Day(NaiveDate);

impl Day {
    pub fn new(date: NaiveDate) -> Day {
        Day(date)
    }

    /// Parse the canonical `YYYY-MM-DD` form.
    pub fn parse(s: &str) -> Result<Day, FactGraphError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Day)
            .map_err(|e| FactGraphError::invalid("Day", format!("{}: {}", s, e)))
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Offset by a signed day count; `None` when the result leaves the
    /// supported calendar range.
    pub fn checked_add_days(self, days: i64) -> Option<Day> {
        let offset = if days >= 0 {
            self.0.checked_add_days(ChronoDays::new(days as u64))
        } else {
            self.0.checked_sub_days(ChronoDays::new(days.unsigned_abs()))
        };
        offset.map(Day)
    }

    /// Signed day count from `other` to `self`.
    pub fn days_since(self, other: Day) -> i64 {
        (self.0 - other.0).num_days()
    }

    /// The last day of this date's month.
    pub fn last_day_of_month(self) -> Day {
        let (y, m) = (self.0.year(), self.0.month());
        let first_of_next = if m == 12 {
            NaiveDate::from_ymd_opt(y + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(y, m + 1, 1)
        };
        // The first of the next month always exists within chrono's range
        // for any representable date, as does the day before it.
        Day(first_of_next
            .and_then(|d| d.pred_opt())
            .unwrap_or(self.0))
    }

    pub fn is_last_day_of_month(self) -> bool {
        self == self.last_day_of_month()
    }

    /// Add `n` calendar months, preserving a last-day-of-month anchor:
    /// Jan 31 + 1 month is Feb 28/29, and Feb 28 (non-leap) + 1 month is
    /// Mar 31, not Mar 28. Non-anchor days clamp to the target month's length.
    pub fn add_payroll_months(self, n: i32) -> Option<Day> {
        let total = self.0.year() * 12 + self.0.month0() as i32 + n;
        let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
        let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
        let last = Day(first).last_day_of_month();
        if self.is_last_day_of_month() {
            return Some(last);
        }
        let day = self.0.day().min(last.0.day());
        NaiveDate::from_ymd_opt(year, month0 + 1, day).map(Day)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
