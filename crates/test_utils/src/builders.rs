//! Test Data Builders
//!
//! Builders for vouchers and units that fill every field with a sensible
//! default, so tests only name what they exercise.

use chrono::NaiveDate;
use core_kernel::{FinancialYear, VoucherNo, VoucherType};
use domain_ledger::{
    BucketAmounts, Buckets, Method, PaymentType, ReceiptType, Unit, Voucher, VoucherLabel,
    CUSTOM_PARTICULARS,
};
use rust_decimal::Decimal;

use crate::fixtures::{FiscalFixtures, UnitFixtures};

/// Builder for constructing test vouchers
#[derive(Debug, Clone)]
pub struct TestVoucherBuilder {
    voucher: Voucher,
}

impl TestVoucherBuilder {
    /// `RV` with a receipt label that is not mirrored
    pub fn receipt(no: i64) -> Self {
        Self::new(
            VoucherType::Rv,
            no,
            VoucherLabel::Receipt(ReceiptType::Other("Subscription".to_string())),
        )
    }

    /// `PV` with a payment label that neither waives nor is mirrored
    pub fn payment(no: i64) -> Self {
        Self::new(
            VoucherType::Pv,
            no,
            VoucherLabel::Payment(PaymentType::Other("Maintenance".to_string())),
        )
    }

    fn new(voucher_type: VoucherType, no: i64, label: VoucherLabel) -> Self {
        Self {
            voucher: Voucher {
                date: FiscalFixtures::voucher_date(),
                voucher_type,
                voucher_no: VoucherNo::new(no),
                particulars: UnitFixtures::ALPHA.to_string(),
                custom: false,
                label,
                method: Method::Cash,
                description: None,
                amounts: BucketAmounts::default(),
                financial_year: FiscalFixtures::fy_2024(),
                counter_voucher_no: None,
                fdr_no: None,
            },
        }
    }

    /// Books the voucher against `unit`
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.voucher.particulars = unit.to_string();
        self.voucher.custom = false;
        self
    }

    /// Uses a free-text particulars label instead of a unit
    pub fn with_custom_particulars(mut self, label: Option<&str>) -> Self {
        self.voucher.particulars = label.unwrap_or(CUSTOM_PARTICULARS).to_string();
        self.voucher.custom = true;
        self
    }

    pub fn with_receipt_type(mut self, receipt_type: ReceiptType) -> Self {
        self.voucher.label = VoucherLabel::Receipt(receipt_type);
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.voucher.label = VoucherLabel::Payment(payment_type);
        self
    }

    /// Sets the transacted amount under `method`
    pub fn amount(mut self, method: Method, amount: Decimal) -> Self {
        self.voucher.method = method;
        self.voucher.amounts = BucketAmounts::default();
        self.voucher.amounts.set(method, amount);
        self
    }

    pub fn cash(self, amount: Decimal) -> Self {
        self.amount(Method::Cash, amount)
    }

    pub fn bank(self, amount: Decimal) -> Self {
        self.amount(Method::Bank, amount)
    }

    /// Dates the voucher and moves it into the matching financial year
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.voucher.date = date;
        self.voucher.financial_year = FinancialYear::from_date(date);
        self
    }

    pub fn with_fdr_no(mut self, fdr_no: &str) -> Self {
        self.voucher.fdr_no = Some(fdr_no.to_string());
        self
    }

    pub fn build(self) -> Voucher {
        self.voucher
    }
}

/// Builder for constructing test units
#[derive(Debug, Clone)]
pub struct TestUnitBuilder {
    name: String,
    ledger_page_number: Option<i32>,
    buckets: Buckets,
}

impl Default for TestUnitBuilder {
    fn default() -> Self {
        Self::new(UnitFixtures::ALPHA)
    }
}

impl TestUnitBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ledger_page_number: None,
            buckets: Buckets::zero(),
        }
    }

    pub fn page(mut self, page: i32) -> Self {
        self.ledger_page_number = Some(page);
        self
    }

    pub fn advance(mut self, amount: Decimal) -> Self {
        self.buckets.advance_amount = amount;
        self
    }

    pub fn current_dues(mut self, amount: Decimal) -> Self {
        self.buckets.current_financial_amount = amount;
        self
    }

    pub fn last_year_dues(mut self, amount: Decimal) -> Self {
        self.buckets.last_financial_year_amount = amount;
        self
    }

    pub fn unpaid(mut self, amount: Decimal) -> Self {
        self.buckets.unpaid_amount = amount;
        self
    }

    pub fn build(self) -> Unit {
        let unit = Unit::new(self.name).with_opening_balances(self.buckets);
        match self.ledger_page_number {
            Some(page) => unit.with_ledger_page_number(page),
            None => unit,
        }
    }
}
