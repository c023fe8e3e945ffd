//! Voucher DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{FinancialYear, Ledger, VoucherKey, VoucherType};
use domain_ledger::{
    BucketAmounts, DeleteOutcome, Method, MutationOutcome, PaymentType, ReceiptType, Unit,
    Voucher, VoucherLabel, CUSTOM_PARTICULARS,
};

use super::lenient;
use crate::error::ApiError;

/// Body of `POST /vouchers` and `PUT /vouchers`
///
/// Field names follow the ledger clients. `particulars`, `receiptType` and
/// `paymentType` may hold `Custom`, in which case the matching `custom*`
/// field carries the actual value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRequest {
    #[serde(default, deserialize_with = "lenient::date")]
    #[validate(required(message = "date is required"))]
    pub date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "lenient::text")]
    #[validate(required(message = "voucherType is required"))]
    pub voucher_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::whole_number")]
    #[validate(required(message = "voucherNo is required"))]
    pub voucher_no: Option<i64>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub particulars: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub custom_particulars: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub receipt_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub custom_receipt_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub payment_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub custom_payment_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    #[validate(required(message = "method is required"))]
    pub method: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub receipt_description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub payment_description: Option<String>,

    #[serde(default, deserialize_with = "lenient::amount")]
    pub cash: Decimal,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub bank: Decimal,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub fdr: Decimal,
    #[serde(default, alias = "syDr", deserialize_with = "lenient::amount")]
    pub sydr: Decimal,
    #[serde(default, alias = "syCr", deserialize_with = "lenient::amount")]
    pub sycr: Decimal,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub property: Decimal,
    #[serde(
        default,
        rename = "eme_journal_fund",
        alias = "emeJournalFund",
        deserialize_with = "lenient::amount"
    )]
    pub eme_journal_fund: Decimal,

    #[serde(default, deserialize_with = "lenient::text")]
    pub financial_year: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub fdr_no: Option<String>,
}

/// Resolves a `Custom` sentinel against its override
///
/// Returns the stored value and whether it came from the override.
fn resolve_custom(value: Option<String>, custom: Option<String>) -> (Option<String>, bool) {
    match (value, custom) {
        (Some(v), Some(c)) if v == CUSTOM_PARTICULARS => (Some(c), true),
        (Some(v), _) => (Some(v), false),
        (None, Some(c)) => (Some(c), true),
        (None, None) => (None, false),
    }
}

impl VoucherRequest {
    pub fn key(&self) -> Result<VoucherKey, ApiError> {
        let voucher_type = self
            .voucher_type
            .as_deref()
            .ok_or_else(|| ApiError::validation("voucherType is required"))?
            .parse::<VoucherType>()?;
        let voucher_no = self
            .voucher_no
            .ok_or_else(|| ApiError::validation("voucherNo is required"))?;
        Ok(VoucherKey::new(voucher_type, voucher_no))
    }

    /// Builds the voucher booked into `financial_year`
    pub fn into_voucher(self, financial_year: FinancialYear) -> Result<Voucher, ApiError> {
        let key = self.key()?;
        let date = self
            .date
            .ok_or_else(|| ApiError::validation("date is required"))?;
        let method = self
            .method
            .as_deref()
            .ok_or_else(|| ApiError::validation("method is required"))?
            .parse::<Method>()?;

        let (particulars, custom) = resolve_custom(self.particulars, self.custom_particulars);

        let (label, description) = match key.ledger() {
            Ledger::Receipt => {
                let label = match resolve_custom(self.receipt_type, self.custom_receipt_type) {
                    (Some(label), true) => ReceiptType::Other(label),
                    (Some(label), false) => ReceiptType::from(label),
                    (None, _) => return Err(ApiError::validation("receiptType is required")),
                };
                (VoucherLabel::Receipt(label), self.receipt_description)
            }
            Ledger::Payment => {
                let label = match resolve_custom(self.payment_type, self.custom_payment_type) {
                    (Some(label), true) => PaymentType::Other(label),
                    (Some(label), false) => PaymentType::from(label),
                    (None, _) => return Err(ApiError::validation("paymentType is required")),
                };
                (VoucherLabel::Payment(label), self.payment_description)
            }
        };

        Ok(Voucher {
            date,
            voucher_type: key.voucher_type,
            voucher_no: key.voucher_no,
            particulars: particulars.unwrap_or_default(),
            custom,
            label,
            method,
            description,
            amounts: BucketAmounts {
                cash: self.cash,
                bank: self.bank,
                fdr: self.fdr,
                sydr: self.sydr,
                sycr: self.sycr,
                property: self.property,
                eme_journal_fund: self.eme_journal_fund,
            },
            financial_year,
            counter_voucher_no: None,
            fdr_no: self.fdr_no,
        })
    }
}

/// Query of `DELETE /vouchers`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVoucherQuery {
    #[validate(required(message = "voucherType is required"))]
    pub voucher_type: Option<String>,
    #[validate(required(message = "voucherNo is required"))]
    pub voucher_no: Option<i64>,
    pub year: Option<String>,
}

impl DeleteVoucherQuery {
    pub fn key(&self) -> Result<VoucherKey, ApiError> {
        let voucher_type = self
            .voucher_type
            .as_deref()
            .ok_or_else(|| ApiError::validation("voucherType is required"))?
            .parse::<VoucherType>()?;
        let voucher_no = self
            .voucher_no
            .ok_or_else(|| ApiError::validation("voucherNo is required"))?;
        Ok(VoucherKey::new(voucher_type, voucher_no))
    }
}

/// Query of `GET /vouchers`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListVouchersQuery {
    pub ledger: Option<Ledger>,
    pub year: Option<String>,
    #[validate(range(min = 1, max = 12, message = "month must be between 1 and 12"))]
    pub month: Option<u32>,
}

/// Query of `GET /vouchers/lastVoucherNo`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LastVoucherNoQuery {
    #[validate(required(message = "Voucher type is required"))]
    pub voucher_type: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherMutationResponse {
    pub message: String,
    pub voucher: Voucher,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_voucher: Option<Voucher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_counter: Option<VoucherKey>,
    pub units: Vec<Unit>,
}

impl VoucherMutationResponse {
    pub fn new(message: impl Into<String>, outcome: MutationOutcome) -> Self {
        Self {
            message: message.into(),
            voucher: outcome.voucher,
            counter_voucher: outcome.counter_voucher,
            removed_counter: outcome.removed_counter,
            units: outcome.units,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVoucherResponse {
    pub message: String,
    pub deleted_count: usize,
    pub deleted: Vec<VoucherKey>,
    pub counters_deleted: Vec<VoucherKey>,
    pub units: Vec<Unit>,
}

impl From<DeleteOutcome> for DeleteVoucherResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            message: "Voucher(s) deleted successfully".to_string(),
            deleted_count: outcome.deleted.len(),
            deleted: outcome.deleted,
            counters_deleted: outcome.counters_deleted,
            units: outcome.units,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastVoucherNoResponse {
    pub last_voucher_no: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn request(body: serde_json::Value) -> VoucherRequest {
        serde_json::from_value(body).unwrap()
    }

    fn fy() -> FinancialYear {
        FinancialYear::starting(2024)
    }

    #[test]
    fn test_custom_particulars_are_resolved_and_flagged() {
        let voucher = request(json!({
            "date": "2024-06-15",
            "voucherType": "RV",
            "voucherNo": "5",
            "particulars": "Custom",
            "customParticulars": "Canteen sale",
            "receiptType": "UCS Amount",
            "method": "cash",
            "cash": "120"
        }))
        .into_voucher(fy())
        .unwrap();

        assert_eq!(voucher.particulars, "Canteen sale");
        assert!(voucher.custom);
        assert_eq!(voucher.unit_name(), None);
        assert_eq!(voucher.transacted_amount(), dec!(120));
    }

    #[test]
    fn test_custom_without_override_stays_custom() {
        let voucher = request(json!({
            "date": "2024-06-15",
            "voucherType": "PV",
            "voucherNo": 2,
            "particulars": "Custom",
            "paymentType": "Custom",
            "customPaymentType": "Stationery",
            "method": "bank",
            "bank": 40
        }))
        .into_voucher(fy())
        .unwrap();

        assert_eq!(voucher.particulars, CUSTOM_PARTICULARS);
        assert!(!voucher.custom);
        assert_eq!(
            voucher.label,
            VoucherLabel::Payment(PaymentType::Other("Stationery".to_string()))
        );
    }

    #[test]
    fn test_custom_label_never_gains_ledger_semantics() {
        let voucher = request(json!({
            "date": "2024-06-15",
            "voucherType": "RV",
            "voucherNo": 1,
            "particulars": "Alpha Company",
            "receiptType": "Custom",
            "customReceiptType": "Matured FD",
            "method": "cash"
        }))
        .into_voucher(fy())
        .unwrap();

        assert_eq!(
            voucher.label,
            VoucherLabel::Receipt(ReceiptType::Other("Matured FD".to_string()))
        );
    }

    #[test]
    fn test_missing_required_fields_fail_validation() {
        let req = request(json!({ "particulars": "Alpha Company" }));
        let err = ApiError::from(req.validate().unwrap_err());
        match err {
            ApiError::Validation { details: Some(details), .. } => {
                assert!(details.contains(&"date is required".to_string()));
                assert!(details.contains(&"voucherType is required".to_string()));
                assert!(details.contains(&"voucherNo is required".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_voucher_type_is_rejected() {
        let err = request(json!({
            "date": "2024-06-15",
            "voucherType": "XV",
            "voucherNo": 1,
            "method": "cash"
        }))
        .into_voucher(fy())
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[test]
    fn test_waveoff_label_parses_to_waiver() {
        let voucher = request(json!({
            "date": "2024-06-15",
            "voucherType": "PV",
            "voucherNo": 7,
            "particulars": "Bravo Battery",
            "paymentType": "Waveoff",
            "method": "cash",
            "cash": 100
        }))
        .into_voucher(fy())
        .unwrap();
        assert!(voucher.payment_type().is_some_and(|t| t.is_waiver()));
    }
}
