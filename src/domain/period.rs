//! Reporting periods and date windows.

use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Time bucket used to group records during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    /// ISO-8601 weeks, Monday first
    Weekly,
    Monthly,
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Period::Daily),
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            other => Err(AppError::validation(format!(
                "Unknown period '{}', expected daily, weekly or monthly",
                other
            ))),
        }
    }
}

/// Inclusive calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    #[schema(value_type = String, format = Date)]
    pub start: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::validation(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window ending on `today`, inclusive.
    pub fn trailing(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days.max(1) - 1),
            end: today,
        }
    }

    /// First to last day of `today`'s month.
    pub fn month_of(today: NaiveDate) -> Self {
        let start = today.with_day(1).unwrap_or(today);
        let next_month = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        };
        let end = next_month.and_then(|d| d.pred_opt()).unwrap_or(today);
        Self { start, end }
    }

    /// Fill missing bounds from a trailing window ending today.
    ///
    /// With only `start`, the window runs to today. With only `end`, it runs
    /// `days` back from `end`.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        days: i64,
    ) -> AppResult<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            (Some(start), None) => Self::new(start, today.max(start)),
            (None, Some(end)) => Ok(Self::trailing(end, days)),
            (None, None) => Ok(Self::trailing(today, days)),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_unknown_period_is_validation_error() {
        let err = "fortnightly".parse::<Period>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!("Weekly".parse::<Period>().unwrap(), Period::Weekly);
    }

    #[test]
    fn test_default_window_is_thirty_days_including_today() {
        let range = DateRange::resolve(None, None, d(2024, 3, 30), 30).unwrap();
        assert_eq!(range.start, d(2024, 3, 1));
        assert_eq!(range.end, d(2024, 3, 30));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(DateRange::resolve(Some(d(2024, 2, 2)), Some(d(2024, 2, 1)), d(2024, 3, 1), 30)
            .is_err());
    }

    #[test]
    fn test_month_of_handles_december_and_leap_years() {
        assert_eq!(
            DateRange::month_of(d(2023, 12, 15)),
            DateRange { start: d(2023, 12, 1), end: d(2023, 12, 31) }
        );
        assert_eq!(DateRange::month_of(d(2024, 2, 10)).end, d(2024, 2, 29));
    }
}
