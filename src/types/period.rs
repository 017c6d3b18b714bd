//! Reporting period (a calendar year or a single month)

use crate::types::{Result, WrappedError};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Period {
    Year { year: i32 },
    Month { year: i32, month: u32 },
}

impl Period {
    pub fn year(year: i32) -> Self {
        Self::Year { year }
    }

    /// Build a monthly period. `month` is 1-based.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(WrappedError::Config(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self::Month { year, month })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Self::Year { year } => date.year() == year,
            Self::Month { year, month } => date.year() == year && date.month() == month,
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        let (year, month) = match *self {
            Self::Year { year } => (year, 1),
            Self::Month { year, month } => (year, month),
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let next = match *self {
            Self::Year { year } => NaiveDate::from_ymd_opt(year + 1, 1, 1),
            Self::Month { year, month: 12 } => NaiveDate::from_ymd_opt(year + 1, 1, 1),
            Self::Month { year, month } => NaiveDate::from_ymd_opt(year, month + 1, 1),
        };
        next.and_then(|d| d.pred_opt()).unwrap_or(NaiveDate::MAX)
    }

    /// Every calendar day of the period, ascending
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |d| *d <= last)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Year { year } => write!(f, "{}", year),
            Self::Month { year, month } => write!(f, "{}-{:02}", year, month),
        }
    }
}
