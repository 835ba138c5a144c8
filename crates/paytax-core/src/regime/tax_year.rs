use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PayrollTaxError;
use crate::PayrollTaxResult;

/// An Indian fiscal year: 1 April to 31 March of the following year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "TaxYearRepr", into = "TaxYearRepr")]
pub struct TaxYear {
    start: NaiveDate,
    end: NaiveDate,
}

/// Accepted wire shapes: `{"start": ..., "end": ...}` or `"2024-25"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TaxYearRepr {
    Span { start: NaiveDate, end: NaiveDate },
    Label(String),
}

impl TaxYear {
    /// Validated constructor; the span must be exactly one April–March year.
    pub fn new(start: NaiveDate, end: NaiveDate) -> PayrollTaxResult<Self> {
        if start.month() != 4 || start.day() != 1 {
            return Err(PayrollTaxError::invalid(
                "tax_year.start",
                format!("{} is not 1 April", start),
            ));
        }
        let expected_end = last_day_of_march(start.year() + 1)?;
        if end != expected_end {
            return Err(PayrollTaxError::invalid(
                "tax_year.end",
                format!("expected {} for a year starting {}, got {}", expected_end, start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// The fiscal year beginning 1 April of `year`.
    pub fn starting(year: i32) -> PayrollTaxResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 4, 1)
            .ok_or_else(|| PayrollTaxError::DateError(format!("no 1 April in year {}", year)))?;
        Self::new(start, last_day_of_march(year + 1)?)
    }

    /// The fiscal year a calendar date falls in.
    pub fn containing(date: NaiveDate) -> PayrollTaxResult<Self> {
        if date.month() >= 4 {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    /// Parse a `"2024-25"` style label.
    pub fn parse_label(label: &str) -> PayrollTaxResult<Self> {
        let invalid = || {
            PayrollTaxError::invalid("tax_year", format!("'{}' is not of the form YYYY-YY", label))
        };
        let (first, second) = label.trim().split_once('-').ok_or_else(invalid)?;
        let start_year: i32 = first.parse().map_err(|_| invalid())?;
        let suffix: i32 = second.parse().map_err(|_| invalid())?;
        if second.len() != 2 || suffix != (start_year + 1) % 100 {
            return Err(invalid());
        }
        Self::starting(start_year)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_year(&self) -> i32 {
        self.start.year()
    }

    /// Display as "2024-25".
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.start.year(), (self.start.year() + 1) % 100)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// The twelve payroll months in order, April first, as `(year, month)`.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let y = self.start.year();
        (4..=12)
            .map(|m| (y, m))
            .chain((1..=3).map(|m| (y + 1, m)))
            .collect()
    }

    /// Zero-based position of a calendar month inside this year.
    pub fn month_index(&self, year: i32, month: u32) -> Option<usize> {
        self.months()
            .iter()
            .position(|&(y, m)| y == year && m == month)
    }
}

impl fmt::Display for TaxYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl TryFrom<TaxYearRepr> for TaxYear {
    type Error = PayrollTaxError;

    fn try_from(repr: TaxYearRepr) -> Result<Self, Self::Error> {
        match repr {
            TaxYearRepr::Span { start, end } => TaxYear::new(start, end),
            TaxYearRepr::Label(label) => TaxYear::parse_label(&label),
        }
    }
}

impl From<TaxYear> for TaxYearRepr {
    fn from(year: TaxYear) -> Self {
        TaxYearRepr::Span {
            start: year.start,
            end: year.end,
        }
    }
}

fn last_day_of_march(year: i32) -> PayrollTaxResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 3, 31)
        .ok_or_else(|| PayrollTaxError::DateError(format!("no 31 March in year {}", year)))
}

/// First day of a calendar month.
pub fn month_start(year: i32, month: u32) -> PayrollTaxResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| PayrollTaxError::DateError(format!("invalid month {}-{}", year, month)))
}

/// Number of calendar days in a month.
pub fn days_in_month(year: i32, month: u32) -> PayrollTaxResult<u32> {
    let first = month_start(year, month)?;
    let next = if month == 12 {
        month_start(year + 1, 1)?
    } else {
        month_start(year, month + 1)?
    };
    Ok((next - first).num_days() as u32)
}
