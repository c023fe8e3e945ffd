//! Financial-year handling
//!
//! The organisation books vouchers in April-to-March financial years. A
//! financial year is identified by the calendar year in which it starts and
//! is rendered as `FY{start}-{start + 1}`, e.g. `FY2024-2025` for the period
//! 1 April 2024 to 31 March 2025.
//!
//! The same identifier is the storage partition key for vouchers, so every
//! voucher store handle is resolved from a `FinancialYear`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Last calendar month (inclusive) that still belongs to the previous year
const LAST_MONTH_OF_PREVIOUS_YEAR: u32 = 3;

/// An April-to-March accounting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinancialYear {
    start_year: i32,
}

impl FinancialYear {
    /// Creates the financial year starting in April of `start_year`
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Resolves the financial year a date falls into
    ///
    /// January to March belong to the year that started the previous April.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use core_kernel::FinancialYear;
    ///
    /// let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
    /// assert_eq!(FinancialYear::from_date(date).to_string(), "FY2024-2025");
    /// ```
    pub fn from_date(date: NaiveDate) -> Self {
        let start_year = if date.month() <= LAST_MONTH_OF_PREVIOUS_YEAR {
            date.year() - 1
        } else {
            date.year()
        };
        Self { start_year }
    }

    /// Calendar year in which the period starts
    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// First day of the period (1 April)
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, 4, 1)
    }

    /// Last day of the period (31 March of the following year)
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year.checked_add(1)?, 3, 31)
    }

    /// Returns true if the date belongs to this financial year
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }

    /// The financial year immediately before this one
    pub fn previous(&self) -> Self {
        Self { start_year: self.start_year.saturating_sub(1) }
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{}-{}", self.start_year, i64::from(self.start_year) + 1)
    }
}

impl FromStr for FinancialYear {
    type Err = CoreError;

    /// Parses `FY2024-2025`; the bare `2024-2025` form is accepted too
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix("FY").unwrap_or(trimmed);
        let invalid = || CoreError::InvalidFinancialYear(s.to_string());

        let (start, end) = body.split_once('-').ok_or_else(invalid)?;
        let start: i32 = start.parse().map_err(|_| invalid())?;
        let end: i32 = end.parse().map_err(|_| invalid())?;

        start
            .checked_add(1)
            .filter(|next| *next == end)
            .ok_or_else(invalid)?;

        Ok(Self { start_year: start })
    }
}

impl Serialize for FinancialYear {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FinancialYear {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_march_belongs_to_previous_year() {
        assert_eq!(FinancialYear::from_date(date(2025, 3, 31)).to_string(), "FY2024-2025");
        assert_eq!(FinancialYear::from_date(date(2025, 1, 1)).to_string(), "FY2024-2025");
    }

    #[test]
    fn test_april_starts_new_year() {
        assert_eq!(FinancialYear::from_date(date(2025, 4, 1)).to_string(), "FY2025-2026");
        assert_eq!(FinancialYear::from_date(date(2025, 12, 31)).to_string(), "FY2025-2026");
    }

    #[test]
    fn test_parse_accepts_bare_form() {
        let fy: FinancialYear = "2023-2024".parse().unwrap();
        assert_eq!(fy, FinancialYear::starting(2023));
        assert_eq!(fy.to_string(), "FY2023-2024");
    }

    #[test]
    fn test_parse_rejects_non_consecutive_years() {
        assert!("FY2023-2025".parse::<FinancialYear>().is_err());
        assert!("FY2023".parse::<FinancialYear>().is_err());
        assert!("garbage".parse::<FinancialYear>().is_err());
    }

    #[test]
    fn test_parse_rejects_year_at_integer_limit() {
        assert!("FY2147483647-0".parse::<FinancialYear>().is_err());
        assert!("FY2147483647--2147483648".parse::<FinancialYear>().is_err());
    }

    #[test]
    fn test_extreme_year_formats_without_overflow() {
        let fy = FinancialYear::starting(i32::MAX);
        assert_eq!(fy.to_string(), "FY2147483647-2147483648");
        assert_eq!(fy.end_date(), None);
        assert_eq!(FinancialYear::starting(i32::MIN).previous().start_year(), i32::MIN);
    }

    #[test]
    fn test_period_bounds() {
        let fy = FinancialYear::starting(2024);
        assert_eq!(fy.start_date(), Some(date(2024, 4, 1)));
        assert_eq!(fy.end_date(), Some(date(2025, 3, 31)));
        assert!(fy.contains(date(2024, 4, 1)));
        assert!(!fy.contains(date(2024, 3, 31)));
        assert_eq!(fy.previous(), FinancialYear::starting(2023));
    }
}
