//! Pre-built Test Fixtures
//!
//! Provides ready-to-use units, vouchers and fixed deposits. The figures
//! mirror the scenarios the ledger has to get right: dues spread over two
//! financial years, a waiver against the unpaid balance, a UCS debit split
//! and a matured deposit.

use chrono::NaiveDate;
use core_kernel::{FinancialYear, VoucherKey, VoucherType};
use domain_ledger::{Buckets, FixedDeposit, PaymentType, ReceiptType, Unit, Voucher};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::builders::TestVoucherBuilder;

/// Fixture for dates and financial years
pub struct FiscalFixtures;

impl FiscalFixtures {
    /// Default voucher date (15 June 2024)
    pub fn voucher_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// Financial year containing [`Self::voucher_date`]
    pub fn fy_2024() -> FinancialYear {
        FinancialYear::starting(2024)
    }

    /// Last day of FY2024-2025
    pub fn year_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }
}

/// Fixture for units
pub struct UnitFixtures;

impl UnitFixtures {
    pub const ALPHA: &'static str = "Alpha Company";
    pub const BRAVO: &'static str = "Bravo Battery";

    /// Unit owing 500 for the current year
    pub fn alpha_current_dues() -> Unit {
        Unit::new(Self::ALPHA)
            .with_ledger_page_number(11)
            .with_opening_balances(Buckets {
                current_financial_amount: dec!(500),
                ..Buckets::zero()
            })
    }

    /// Unit owing 40 from last year and 500 for the current year
    pub fn alpha_two_year_dues() -> Unit {
        Unit::new(Self::ALPHA)
            .with_ledger_page_number(11)
            .with_opening_balances(Buckets {
                last_financial_year_amount: dec!(40),
                current_financial_amount: dec!(500),
                ..Buckets::zero()
            })
    }

    /// Unit with 100 eligible for waiver
    pub fn bravo_unpaid() -> Unit {
        Unit::new(Self::BRAVO)
            .with_ledger_page_number(12)
            .with_opening_balances(Buckets {
                unpaid_amount: dec!(100),
                current_financial_amount: dec!(250),
                ..Buckets::zero()
            })
    }

    pub fn with_balances(name: &str, buckets: Buckets) -> Unit {
        Unit::new(name).with_opening_balances(buckets)
    }
}

/// Fixture for vouchers
pub struct VoucherFixtures;

impl VoucherFixtures {
    /// Plain receipt without a counter voucher
    pub fn receipt(no: i64, unit: &str, amount: Decimal) -> Voucher {
        TestVoucherBuilder::receipt(no)
            .with_unit(unit)
            .cash(amount)
            .build()
    }

    /// `Wavier` payment against `unit`
    pub fn waiver(no: i64, unit: &str, amount: Decimal) -> Voucher {
        TestVoucherBuilder::payment(no)
            .with_unit(unit)
            .with_payment_type(PaymentType::Waiver)
            .cash(amount)
            .build()
    }

    /// `UCS Amount Dr` receipt against `unit`
    pub fn ucs_amount_dr(no: i64, unit: &str, amount: Decimal) -> Voucher {
        TestVoucherBuilder::receipt(no)
            .with_unit(unit)
            .with_receipt_type(ReceiptType::UcsAmountDr)
            .bank(amount)
            .build()
    }

    /// `Matured FD` receipt referencing [`DepositFixtures::matured`]
    pub fn matured_fd(no: i64, unit: &str) -> Voucher {
        TestVoucherBuilder::receipt(no)
            .with_unit(unit)
            .with_receipt_type(ReceiptType::MaturedFd)
            .bank(dec!(5400))
            .with_fdr_no(DepositFixtures::MATURED_FDR_NO)
            .build()
    }

    pub fn key(voucher_type: VoucherType, no: i64) -> VoucherKey {
        VoucherKey::new(voucher_type, no)
    }
}

/// Fixture for fixed deposits
pub struct DepositFixtures;

impl DepositFixtures {
    pub const MATURED_FDR_NO: &'static str = "FDR-2023-017";

    /// Deposit of 5000 that matured with 400 interest
    pub fn matured() -> FixedDeposit {
        FixedDeposit {
            fdr_no: Self::MATURED_FDR_NO.to_string(),
            date_of_deposit: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            amount: dec!(5000),
            maturity_value: dec!(5400),
            maturity_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            duration: Some("12 months".to_string()),
            int_rate: dec!(8),
            interest_amount: dec!(400),
            bank: Some("State Bank".to_string()),
            remarks: None,
        }
    }
}
