//! Permissive ISO partial-date parsing

use crate::error::{SearchError, SearchResult};
use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static PARTIAL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})(?:-(\d{1,2})(?:-(\d{1,2})(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?)?)?$",
    )
    .expect("partial date pattern is valid")
});

/// Day-level interval covered by a partial date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DatePeriod {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// Parse `yyyy`, `yyyy-MM`, `yyyy-MM-dd` or a datetime truncated to its day.
///
/// A year widens to `[Jan 1, Dec 31]`, a year-month to the whole month.
pub fn parse_partial_date(value: &str) -> SearchResult<DatePeriod> {
    let trimmed = value.trim();
    let caps = PARTIAL_DATE
        .captures(trimmed)
        .ok_or_else(|| SearchError::value(format!("'{}' is not a valid date", value)))?;

    let invalid = || SearchError::value(format!("'{}' is not a valid date", value));
    let number = |index: usize| -> Option<u32> {
        caps.get(index).and_then(|m| m.as_str().parse::<u32>().ok())
    };

    let year = caps[1].parse::<i32>().map_err(|_| invalid())?;

    let Some(month) = number(2) else {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid)?;
        return Ok(DatePeriod { start, end });
    };

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let Some(day) = number(3) else {
        let end = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)?;
        return Ok(DatePeriod { start: first, end });
    };

    let date = NaiveDate::from_ymd_opt(first.year(), first.month(), day).ok_or_else(invalid)?;

    if let (Some(hour), Some(minute)) = (number(4), number(5)) {
        NaiveTime::from_hms_opt(hour, minute, number(6).unwrap_or(0)).ok_or_else(invalid)?;
    }

    Ok(DatePeriod::day(date))
}

/// First day of the period a lower range bound names
pub fn lower_bound(value: &str) -> SearchResult<NaiveDate> {
    parse_partial_date(value).map(|period| period.start)
}

/// Last day of the period an upper range bound names
pub fn upper_bound(value: &str) -> SearchResult<NaiveDate> {
    parse_partial_date(value).map(|period| period.end)
}
