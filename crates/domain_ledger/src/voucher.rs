//! Receipt and payment vouchers
//!
//! A voucher records one monetary movement. Its type label (`receiptType` or
//! `paymentType`) decides how the movement affects a unit and whether it is
//! mirrored into the opposite ledger; its `method` names the amount field
//! that carries the transacted value.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{FinancialYear, Ledger, VoucherKey, VoucherNo, VoucherType};

use crate::error::LedgerError;

/// Particulars sentinel for vouchers not attributable to a unit
pub const CUSTOM_PARTICULARS: &str = "Custom";

/// Amount field holding the transacted value of a voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Cash,
    Bank,
    Fdr,
    Sydr,
    Sycr,
    Property,
    EmeJournalFund,
    /// Counter vouchers only; transacts nothing
    None,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Cash => "cash",
            Method::Bank => "bank",
            Method::Fdr => "fdr",
            Method::Sydr => "sydr",
            Method::Sycr => "sycr",
            Method::Property => "property",
            Method::EmeJournalFund => "eme_journal_fund",
            Method::None => "none",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Method::Cash),
            "bank" => Ok(Method::Bank),
            "fdr" => Ok(Method::Fdr),
            "sydr" | "syDr" => Ok(Method::Sydr),
            "sycr" | "syCr" => Ok(Method::Sycr),
            "property" => Ok(Method::Property),
            "eme_journal_fund" | "emeJournalFund" => Ok(Method::EmeJournalFund),
            "none" => Ok(Method::None),
            other => Err(LedgerError::validation(format!("Unknown method: {}", other))),
        }
    }
}

/// The seven amount fields of a voucher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketAmounts {
    pub cash: Decimal,
    pub bank: Decimal,
    pub fdr: Decimal,
    #[serde(alias = "syDr")]
    pub sydr: Decimal,
    #[serde(alias = "syCr")]
    pub sycr: Decimal,
    pub property: Decimal,
    #[serde(alias = "emeJournalFund")]
    pub eme_journal_fund: Decimal,
}

impl BucketAmounts {
    /// Amount booked under `method`; `none` always reads 0
    pub fn get(&self, method: Method) -> Decimal {
        match method {
            Method::Cash => self.cash,
            Method::Bank => self.bank,
            Method::Fdr => self.fdr,
            Method::Sydr => self.sydr,
            Method::Sycr => self.sycr,
            Method::Property => self.property,
            Method::EmeJournalFund => self.eme_journal_fund,
            Method::None => Decimal::ZERO,
        }
    }

    /// Books `amount` under `method`; writing to `none` is ignored
    pub fn set(&mut self, method: Method, amount: Decimal) {
        let slot = match method {
            Method::Cash => &mut self.cash,
            Method::Bank => &mut self.bank,
            Method::Fdr => &mut self.fdr,
            Method::Sydr => &mut self.sydr,
            Method::Sycr => &mut self.sycr,
            Method::Property => &mut self.property,
            Method::EmeJournalFund => &mut self.eme_journal_fund,
            Method::None => return,
        };
        *slot = amount;
    }

    pub fn total(&self) -> Decimal {
        self.cash
            + self.bank
            + self.fdr
            + self.sydr
            + self.sycr
            + self.property
            + self.eme_journal_fund
    }

    fn iter(&self) -> [(&'static str, Decimal); 7] {
        [
            ("cash", self.cash),
            ("bank", self.bank),
            ("fdr", self.fdr),
            ("sydr", self.sydr),
            ("sycr", self.sycr),
            ("property", self.property),
            ("eme_journal_fund", self.eme_journal_fund),
        ]
    }
}

const COUNTER_ENTRY: &str = "Counter Entry";

/// Receipt type label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReceiptType {
    InterestOnFd,
    UcsAmount,
    LifetimeSubscription,
    PropertyOnCharge,
    MaturedFd,
    UcsAmountDr,
    CounterEntry,
    /// Any label without ledger semantics, including resolved custom labels
    Other(String),
}

impl ReceiptType {
    pub fn as_str(&self) -> &str {
        match self {
            ReceiptType::InterestOnFd => "Interest on FD",
            ReceiptType::UcsAmount => "UCS Amount",
            ReceiptType::LifetimeSubscription => "Lifetime Subscription",
            ReceiptType::PropertyOnCharge => "Property on Charge",
            ReceiptType::MaturedFd => "Matured FD",
            ReceiptType::UcsAmountDr => "UCS Amount Dr",
            ReceiptType::CounterEntry => COUNTER_ENTRY,
            ReceiptType::Other(label) => label,
        }
    }
}

impl From<String> for ReceiptType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Interest on FD" => ReceiptType::InterestOnFd,
            "UCS Amount" => ReceiptType::UcsAmount,
            "Lifetime Subscription" => ReceiptType::LifetimeSubscription,
            "Property on Charge" => ReceiptType::PropertyOnCharge,
            "Matured FD" => ReceiptType::MaturedFd,
            "UCS Amount Dr" => ReceiptType::UcsAmountDr,
            COUNTER_ENTRY => ReceiptType::CounterEntry,
            _ => ReceiptType::Other(label),
        }
    }
}

impl From<&str> for ReceiptType {
    fn from(label: &str) -> Self {
        ReceiptType::from(label.to_string())
    }
}

impl From<ReceiptType> for String {
    fn from(t: ReceiptType) -> String {
        match t {
            ReceiptType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment type label
///
/// `Waveoff` and `Wavier` name the same waiver; both parse to
/// [`PaymentType::Waiver`], which is stored as `Wavier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentType {
    DepreciationAmount,
    Waiver,
    EmeJournalFund,
    CounterEntry,
    Other(String),
}

impl PaymentType {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentType::DepreciationAmount => "Depreciation Amount",
            PaymentType::Waiver => "Wavier",
            PaymentType::EmeJournalFund => "EME Journal Fund",
            PaymentType::CounterEntry => COUNTER_ENTRY,
            PaymentType::Other(label) => label,
        }
    }

    pub fn is_waiver(&self) -> bool {
        matches!(self, PaymentType::Waiver)
    }
}

impl From<String> for PaymentType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Depreciation Amount" => PaymentType::DepreciationAmount,
            "Wavier" | "Waveoff" => PaymentType::Waiver,
            "EME Journal Fund" => PaymentType::EmeJournalFund,
            COUNTER_ENTRY => PaymentType::CounterEntry,
            _ => PaymentType::Other(label),
        }
    }
}

impl From<&str> for PaymentType {
    fn from(label: &str) -> Self {
        PaymentType::from(label.to_string())
    }
}

impl From<PaymentType> for String {
    fn from(t: PaymentType) -> String {
        match t {
            PaymentType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receipt or payment type label of a voucher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherLabel {
    #[serde(rename = "receiptType")]
    Receipt(ReceiptType),
    #[serde(rename = "paymentType")]
    Payment(PaymentType),
}

impl VoucherLabel {
    pub fn ledger(&self) -> Ledger {
        match self {
            VoucherLabel::Receipt(_) => Ledger::Receipt,
            VoucherLabel::Payment(_) => Ledger::Payment,
        }
    }

    /// Label of a generated counter voucher in `ledger`
    pub fn counter_entry(ledger: Ledger) -> Self {
        match ledger {
            Ledger::Receipt => VoucherLabel::Receipt(ReceiptType::CounterEntry),
            Ledger::Payment => VoucherLabel::Payment(PaymentType::CounterEntry),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VoucherLabel::Receipt(t) => t.as_str(),
            VoucherLabel::Payment(t) => t.as_str(),
        }
    }
}

/// A receipt or payment voucher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub date: NaiveDate,
    pub voucher_type: VoucherType,
    pub voucher_no: VoucherNo,
    /// Unit name, a resolved custom label, or [`CUSTOM_PARTICULARS`]
    pub particulars: String,
    /// Particulars are a free-text label rather than a unit name
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom: bool,
    #[serde(flatten)]
    pub label: VoucherLabel,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub amounts: BucketAmounts,
    pub financial_year: FinancialYear,
    #[serde(default)]
    pub counter_voucher_no: Option<VoucherNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fdr_no: Option<String>,
}

impl Voucher {
    pub fn key(&self) -> VoucherKey {
        VoucherKey::new(self.voucher_type, self.voucher_no)
    }

    pub fn ledger(&self) -> Ledger {
        self.voucher_type.ledger()
    }

    /// Value of the amount field named by `method`
    pub fn transacted_amount(&self) -> Decimal {
        self.amounts.get(self.method)
    }

    /// Name of the unit this voucher is booked against
    pub fn unit_name(&self) -> Option<&str> {
        let name = self.particulars.trim();
        if self.custom || name.is_empty() || name == CUSTOM_PARTICULARS {
            None
        } else {
            Some(name)
        }
    }

    pub fn receipt_type(&self) -> Option<&ReceiptType> {
        match &self.label {
            VoucherLabel::Receipt(t) => Some(t),
            VoucherLabel::Payment(_) => None,
        }
    }

    pub fn payment_type(&self) -> Option<&PaymentType> {
        match &self.label {
            VoucherLabel::Payment(t) => Some(t),
            VoucherLabel::Receipt(_) => None,
        }
    }

    /// Checks the voucher before any store is touched
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.voucher_no.value() <= 0 {
            return Err(LedgerError::validation(format!(
                "Voucher number must be positive, got {}",
                self.voucher_no
            )));
        }

        if self.label.ledger() != self.ledger() {
            return Err(LedgerError::validation(format!(
                "{} voucher {} cannot carry a {} type label",
                self.ledger(),
                self.key(),
                self.label.ledger()
            )));
        }

        if let Some((field, amount)) = self
            .amounts
            .iter()
            .into_iter()
            .find(|(_, amount)| *amount < Decimal::ZERO)
        {
            return Err(LedgerError::validation(format!(
                "Amount {} must not be negative, got {}",
                field, amount
            )));
        }

        if self.particulars.trim().is_empty() {
            return Err(LedgerError::validation("Particulars are required"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn receipt() -> Voucher {
        Voucher {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            voucher_type: VoucherType::Rv,
            voucher_no: VoucherNo::new(3),
            particulars: "Alpha".to_string(),
            custom: false,
            label: VoucherLabel::Receipt(ReceiptType::UcsAmount),
            method: Method::Bank,
            description: None,
            amounts: BucketAmounts {
                bank: dec!(250),
                ..Default::default()
            },
            financial_year: FinancialYear::starting(2024),
            counter_voucher_no: None,
            fdr_no: None,
        }
    }

    #[test]
    fn test_transacted_amount_follows_method() {
        let mut voucher = receipt();
        assert_eq!(voucher.transacted_amount(), dec!(250));

        voucher.method = Method::Cash;
        assert_eq!(voucher.transacted_amount(), Decimal::ZERO);

        voucher.method = Method::None;
        assert_eq!(voucher.transacted_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_custom_particulars_have_no_unit() {
        let mut voucher = receipt();
        assert_eq!(voucher.unit_name(), Some("Alpha"));
        voucher.particulars = CUSTOM_PARTICULARS.to_string();
        assert_eq!(voucher.unit_name(), None);

        voucher.particulars = "Office Stationery".to_string();
        voucher.custom = true;
        assert_eq!(voucher.unit_name(), None);
    }

    #[test]
    fn test_waiver_labels_unify() {
        assert_eq!(PaymentType::from("Waveoff"), PaymentType::Waiver);
        assert_eq!(PaymentType::from("Wavier"), PaymentType::Waiver);
        assert_eq!(String::from(PaymentType::Waiver), "Wavier");
        assert_eq!(
            PaymentType::from("Stationery"),
            PaymentType::Other("Stationery".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_label_from_other_ledger() {
        let mut voucher = receipt();
        voucher.label = VoucherLabel::Payment(PaymentType::Waiver);
        assert!(matches!(voucher.validate(), Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let mut voucher = receipt();
        voucher.amounts.cash = dec!(-1);
        assert!(voucher.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_number() {
        let mut voucher = receipt();
        voucher.voucher_no = VoucherNo::new(0);
        assert!(voucher.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(receipt()).unwrap();

        assert_eq!(json["voucherType"], "RV");
        assert_eq!(json["receiptType"], "UCS Amount");
        assert_eq!(json["method"], "bank");
        assert_eq!(json["financialYear"], "FY2024-2025");
        assert!(json.get("eme_journal_fund").is_some());
        assert!(json.get("emeJournalFund").is_none());
        assert!(json.get("paymentType").is_none());

        let back: Voucher = serde_json::from_value(json).unwrap();
        assert_eq!(back, receipt());
    }

    #[test]
    fn test_deserialize_defaults_missing_amounts() {
        let json = serde_json::json!({
            "date": "2024-07-01",
            "voucherType": "PV",
            "voucherNo": 7,
            "particulars": "Alpha",
            "paymentType": "Waveoff",
            "method": "cash",
            "cash": "100",
            "emeJournalFund": "5",
            "financialYear": "FY2024-2025"
        });

        let voucher: Voucher = serde_json::from_value(json).unwrap();
        assert_eq!(voucher.payment_type(), Some(&PaymentType::Waiver));
        assert_eq!(voucher.amounts.cash, dec!(100));
        assert_eq!(voucher.amounts.bank, Decimal::ZERO);
        assert_eq!(voucher.amounts.eme_journal_fund, dec!(5));
        assert_eq!(voucher.counter_voucher_no, None);
    }
}
