//! Fixed deposit receipts referenced by `Matured FD` vouchers

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A fixed deposit held by the organisation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDeposit {
    pub fdr_no: String,
    pub date_of_deposit: NaiveDate,
    /// Principal
    pub amount: Decimal,
    #[serde(default)]
    pub maturity_value: Decimal,
    #[serde(default)]
    pub maturity_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub int_rate: Decimal,
    /// Interest accrued at maturity
    #[serde(default)]
    pub interest_amount: Decimal,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl FixedDeposit {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.fdr_no.trim().is_empty() {
            return Err(LedgerError::validation("FDR number is required"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("FDR amount must be positive"));
        }
        if self.interest_amount < Decimal::ZERO {
            return Err(LedgerError::validation("FDR interest amount must not be negative"));
        }
        if let Some(maturity) = self.maturity_date {
            if maturity < self.date_of_deposit {
                return Err(LedgerError::validation(
                    "FDR maturity date cannot precede the date of deposit",
                ));
            }
        }
        Ok(())
    }
}
