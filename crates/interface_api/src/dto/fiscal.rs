//! Financial-year resolution for a request

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::FinancialYear;

use crate::error::ApiError;

/// `?year=` query parameter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<String>,
}

/// Picks the financial year a request addresses
///
/// The query `year` wins over the body `financialYear`, which wins over
/// the year derived from the body `date`.
pub fn resolve_financial_year(
    query_year: Option<&str>,
    body_year: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<FinancialYear, ApiError> {
    let explicit = query_year
        .into_iter()
        .chain(body_year)
        .map(str::trim)
        .find(|s| !s.is_empty());

    match (explicit, date) {
        (Some(year), _) => Ok(year.parse::<FinancialYear>()?),
        (None, Some(date)) => Ok(FinancialYear::from_date(date)),
        (None, None) => Err(ApiError::BadRequest("Financial year is required".to_string())),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialYearsResponse {
    pub financial_years: Vec<FinancialYear>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_query_year_wins() {
        let fy = resolve_financial_year(Some("FY2023-2024"), Some("FY2024-2025"), date(2024, 6, 1))
            .unwrap();
        assert_eq!(fy, FinancialYear::starting(2023));
    }

    #[test]
    fn test_body_year_wins_over_date() {
        let fy = resolve_financial_year(None, Some("2022-2023"), date(2024, 6, 1)).unwrap();
        assert_eq!(fy, FinancialYear::starting(2022));
    }

    #[test]
    fn test_date_in_march_belongs_to_previous_start_year() {
        let fy = resolve_financial_year(None, None, date(2025, 3, 31)).unwrap();
        assert_eq!(fy, FinancialYear::starting(2024));
    }

    #[test]
    fn test_missing_year_is_bad_request() {
        let err = resolve_financial_year(Some(" "), None, None).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Financial year is required"));
    }

    #[test]
    fn test_malformed_year_is_rejected() {
        assert!(resolve_financial_year(Some("FY2024"), None, None).is_err());
        assert!(resolve_financial_year(Some("FY2147483647-0"), None, None).is_err());
    }
}
