//! Unit DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use domain_ledger::{Buckets, Unit, CUSTOM_PARTICULARS};

use super::lenient;
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitListQuery {
    pub search: Option<String>,
}

/// Body of `POST /units`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "nameOfUnit is required"))]
    pub name_of_unit: String,
    pub ledger_page_number: Option<i32>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub advance_amount: Decimal,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub current_financial_amount: Decimal,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub last_financial_year_amount: Decimal,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub unpaid_amount: Decimal,
}

impl CreateUnitRequest {
    /// Opens the unit with the requested balances and no history
    pub fn into_unit(self) -> Result<Unit, ApiError> {
        let name = self.name_of_unit.trim();
        if name.is_empty() {
            return Err(ApiError::validation("nameOfUnit is required"));
        }
        if name == CUSTOM_PARTICULARS {
            return Err(ApiError::validation(format!(
                "'{}' is reserved for vouchers without a unit",
                CUSTOM_PARTICULARS
            )));
        }

        let buckets = Buckets {
            advance_amount: self.advance_amount,
            current_financial_amount: self.current_financial_amount,
            last_financial_year_amount: self.last_financial_year_amount,
            unpaid_amount: self.unpaid_amount,
        };
        let mut unit = Unit::new(name).with_opening_balances(buckets);
        if let Some(page) = self.ledger_page_number {
            unit = unit.with_ledger_page_number(page);
        }
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_unit_opens_with_requested_balances() {
        let request: CreateUnitRequest = serde_json::from_value(json!({
            "nameOfUnit": " Alpha Company ",
            "ledgerPageNumber": 11,
            "currentFinancialAmount": "500"
        }))
        .unwrap();

        let unit = request.into_unit().unwrap();
        assert_eq!(unit.name(), "Alpha Company");
        assert_eq!(unit.ledger_page_number(), Some(11));
        assert_eq!(unit.buckets().current_financial_amount, dec!(500));
        assert!(unit.history().is_empty());
    }

    #[test]
    fn test_custom_sentinel_is_not_a_unit_name() {
        let request = CreateUnitRequest {
            name_of_unit: "Custom".to_string(),
            ..Default::default()
        };
        assert!(request.into_unit().is_err());
    }
}
